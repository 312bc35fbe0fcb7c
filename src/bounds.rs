//! Content bounds detection.
//!
//! Many scans and exported photos already sit on their own white margin.
//! The caption should line up with the real picture, not with that margin,
//! so the placed bitmap is scanned for the smallest rect that differs from
//! a uniform light background.
//!
//! The kernel works on a raw row-major pixel buffer and never fails: every
//! reason to give up is a [`Degraded`] value that gets logged at `debug` and
//! turned into `None`.

use crate::config::DetectionConfig;
use crate::imaging::calculations::downsampled_dimensions;
use crate::types::Rect;

/// Why detection gave up. Internal diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Degraded {
    /// Zero-sized buffer, fewer than 3 channels, or a short pixel slice.
    MalformedBuffer,
    /// Corner background darker than the brightness floor.
    DarkBackground { brightness: f64 },
    /// Corners disagree too much to be a uniform margin.
    NonUniformCorners { variance: f64 },
    /// Nothing stands out from the background.
    NoContent,
    /// Content touches (almost) every edge, so nothing is inset.
    NotInset,
}

/// Find the content rect inside a bordered image, relative to the buffer.
///
/// `pixels` is row-major with `channels` bytes per pixel; only the first
/// three channels (RGB) are read.
pub fn detect_content_bounds(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    cfg: &DetectionConfig,
) -> Option<Rect> {
    match scan(pixels, width, height, channels, cfg) {
        Ok(rect) => Some(rect),
        Err(reason) => {
            tracing::debug!(?reason, width, height, "content bounds not detected");
            None
        }
    }
}

/// Nearest-sample view of the buffer at a bounded resolution.
struct Sampler<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    channels: usize,
    sample_w: u32,
    sample_h: u32,
}

impl Sampler<'_> {
    fn rgb(&self, sx: u32, sy: u32) -> [f64; 3] {
        let x = (sx as u64 * self.width as u64 / self.sample_w as u64) as usize;
        let y = (sy as u64 * self.height as u64 / self.sample_h as u64) as usize;
        let i = (y * self.width as usize + x) * self.channels;
        [
            self.pixels[i] as f64,
            self.pixels[i + 1] as f64,
            self.pixels[i + 2] as f64,
        ]
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

fn scan(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    cfg: &DetectionConfig,
) -> Result<Rect, Degraded> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels));
    if width == 0 || height == 0 || channels < 3 || expected.is_none_or(|n| pixels.len() < n) {
        return Err(Degraded::MalformedBuffer);
    }

    let (sample_w, sample_h) = downsampled_dimensions(width, height, cfg.max_sample_edge);
    let sampler = Sampler {
        pixels,
        width,
        height,
        channels,
        sample_w,
        sample_h,
    };

    // 1. Background from the four corners
    let corners = [
        sampler.rgb(0, 0),
        sampler.rgb(sample_w - 1, 0),
        sampler.rgb(0, sample_h - 1),
        sampler.rgb(sample_w - 1, sample_h - 1),
    ];
    let mut background = [0.0; 3];
    for corner in &corners {
        for (acc, v) in background.iter_mut().zip(corner) {
            *acc += v / 4.0;
        }
    }
    let brightness = background.iter().sum::<f64>() / 3.0;
    if brightness < cfg.brightness_floor {
        return Err(Degraded::DarkBackground { brightness });
    }
    let mut variance: f64 = 0.0;
    for (i, a) in corners.iter().enumerate() {
        for b in &corners[i + 1..] {
            variance = variance.max(distance(*a, *b));
        }
    }
    if variance > cfg.corner_variance_ceiling {
        return Err(Degraded::NonUniformCorners { variance });
    }

    // 2. Bounding box of everything that differs from it
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for sy in 0..sample_h {
        for sx in 0..sample_w {
            if distance(sampler.rgb(sx, sy), background) > cfg.pixel_diff_threshold {
                min_x = min_x.min(sx);
                min_y = min_y.min(sy);
                max_x = max_x.max(sx);
                max_y = max_y.max(sy);
            }
        }
    }
    if min_x == u32::MAX {
        return Err(Degraded::NoContent);
    }

    // 3. Reject boxes that are not meaningfully inset on any side
    let inset_x = cfg.min_inset_ratio * sample_w as f64;
    let inset_y = cfg.min_inset_ratio * sample_h as f64;
    let margins = [
        (min_x as f64, inset_x),
        ((sample_w - 1 - max_x) as f64, inset_x),
        (min_y as f64, inset_y),
        ((sample_h - 1 - max_y) as f64, inset_y),
    ];
    if margins.iter().all(|(margin, floor)| margin < floor) {
        return Err(Degraded::NotInset);
    }

    // 4. Back to full resolution: floor the origin, ceil the far edge
    let scale_x = width as f64 / sample_w as f64;
    let scale_y = height as f64 / sample_h as f64;
    let x0 = ((min_x as f64 * scale_x).floor() as u32).min(width - 1);
    let y0 = ((min_y as f64 * scale_y).floor() as u32).min(height - 1);
    let x1 = (((max_x + 1) as f64 * scale_x).ceil() as u32).min(width);
    let y1 = (((max_y + 1) as f64 * scale_y).ceil() as u32).min(height);
    Ok(Rect::new(x0, y0, x1.max(x0 + 1) - x0, y1.max(y0 + 1) - y0))
}
