//! Engine configuration.
//!
//! Every ratio, threshold and color the engine uses lives in [`StampConfig`],
//! an immutable value handed to [`StampEngine`](crate::compose::StampEngine)
//! at construction. Two engines with different tunings can run side by side.
//!
//! ## Config File
//!
//! The CLI reads an optional `stamp.toml` (`--config path`). Values are merged
//! key-by-key over the stock defaults, so a file only needs the keys it wants
//! to change:
//!
//! ```toml
//! [typography]
//! cjk_family = "Noto Serif CJK SC"
//!
//! [detection]
//! brightness_floor = 215.0
//! ```
//!
//! Unknown keys are rejected to catch typos early. Run `photo-stamp gen-config`
//! for a fully commented file with every default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full engine configuration. All sections have defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StampConfig {
    /// Caption band placement.
    pub layout: LayoutConfig,
    /// Font sizing, spacing and families.
    pub typography: TypographyConfig,
    /// Content bounds detector thresholds.
    pub detection: DetectionConfig,
    /// Canvas and caption colors.
    pub colors: ColorConfig,
    /// Encoder settings.
    pub output: OutputConfig,
    /// Interactive preview settings.
    pub preview: PreviewConfig,
    /// Export worker settings.
    pub processing: ProcessingConfig,
    /// Export directory naming.
    pub export: ExportConfig,
}

impl StampConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("layout.right_mode_aspect", self.layout.right_mode_aspect),
            ("layout.band_multiple", self.layout.band_multiple),
            ("typography.font_ratio", self.typography.font_ratio),
            ("typography.line_height_ratio", self.typography.line_height_ratio),
            ("typography.edge_margin_ratio", self.typography.edge_margin_ratio),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Validation(format!("{key} must be > 0")));
            }
        }
        let non_negative = [
            ("typography.line_gap_ratio", self.typography.line_gap_ratio),
            ("typography.min_gap_ratio", self.typography.min_gap_ratio),
            ("detection.brightness_floor", self.detection.brightness_floor),
            (
                "detection.corner_variance_ceiling",
                self.detection.corner_variance_ceiling,
            ),
            (
                "detection.pixel_diff_threshold",
                self.detection.pixel_diff_threshold,
            ),
            ("detection.min_inset_ratio", self.detection.min_inset_ratio),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Validation(format!("{key} must be >= 0")));
            }
        }
        if self.detection.max_sample_edge < 2 {
            return Err(ConfigError::Validation(
                "detection.max_sample_edge must be at least 2".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if !(self.preview.scale > 0.0 && self.preview.scale <= 1.0) {
            return Err(ConfigError::Validation(
                "preview.scale must be in (0, 1]".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        if self.export.directory_prefix.trim().is_empty()
            || self.export.directory_prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::Validation(
                "export.directory_prefix must be a plain, non-empty name".into(),
            ));
        }
        for (key, value) in [
            ("colors.background", &self.colors.background),
            ("colors.text", &self.colors.text),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a #rrggbb color, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}

/// Caption band placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Height/width ratio at or above which a captioned source switches to
    /// the vertical right-hand caption strip.
    pub right_mode_aspect: f64,
    /// Minimum band thickness as a multiple of the font size. The band is
    /// widened further when two lines plus margins need more room.
    pub band_multiple: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            right_mode_aspect: 1.8,
            band_multiple: 3.0,
        }
    }
}

/// Font sizing and families. All spacing is a multiple of the font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypographyConfig {
    /// Font size as a fraction of canvas height.
    pub font_ratio: f64,
    /// Line height as a multiple of the font size.
    pub line_height_ratio: f64,
    /// Gap between two caption lines.
    pub line_gap_ratio: f64,
    /// Safety margin between caption text and canvas/band edges.
    pub edge_margin_ratio: f64,
    /// Minimum gap between the place/description fragment and the date.
    pub min_gap_ratio: f64,
    /// Joins location and description.
    pub separator: String,
    /// Font family list for Latin and other non-CJK runs.
    pub latin_family: String,
    /// Font family list for CJK runs.
    pub cjk_family: String,
    /// Extra directories scanned for `.ttf`/`.otf`/`.ttc` files.
    pub font_dirs: Vec<String>,
}

impl Default for TypographyConfig {
    fn default() -> Self {
        Self {
            font_ratio: 0.03,
            line_height_ratio: 1.25,
            line_gap_ratio: 0.35,
            edge_margin_ratio: 0.75,
            min_gap_ratio: 1.5,
            separator: "  ".to_string(),
            latin_family: "Helvetica Neue, Arial, DejaVu Sans".to_string(),
            cjk_family: "PingFang SC, Noto Sans CJK SC, Source Han Sans SC, Microsoft YaHei"
                .to_string(),
            font_dirs: Vec::new(),
        }
    }
}

/// Content bounds detector thresholds.
///
/// Tuned for photos sitting on a white or near-white margin. Sources on
/// colored backgrounds are expected to come back undetected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Longest side of the downsampled scan buffer.
    pub max_sample_edge: u32,
    /// Minimum mean RGB brightness (0-255) of the corner background.
    pub brightness_floor: f64,
    /// Maximum pairwise RGB distance between the four corners.
    pub corner_variance_ceiling: f64,
    /// RGB distance from the background above which a pixel counts as content.
    pub pixel_diff_threshold: f64,
    /// Margins below this fraction of the dimension on every side mean nothing is inset.
    pub min_inset_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_sample_edge: 320,
            brightness_floor: 200.0,
            corner_variance_ceiling: 24.0,
            pixel_diff_threshold: 48.0,
            min_inset_ratio: 0.02,
        }
    }
}

/// Canvas and caption colors as `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub background: String,
    pub text: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#333333".to_string(),
        }
    }
}

impl ColorConfig {
    /// Background as RGB. Falls back to white for unvalidated configs.
    pub fn background_rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.background).unwrap_or([255, 255, 255])
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG quality (1 = worst, 100 = best). PNG output ignores it.
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 92 }
    }
}

/// Interactive preview settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Canvas scale relative to the full print size.
    pub scale: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { scale: 0.25 }
    }
}

/// Export worker settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Number of photos rendered concurrently during export.
    /// When absent, export is strictly sequential.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective export worker count.
///
/// - `None` → 1 (sequential)
/// - `Some(n)` → `min(n, cores)`, at least 1
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_workers
        .map(|n| n.clamp(1, cores))
        .unwrap_or(1)
}

/// Export directory naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Run directories are named `<prefix>-<target>` under the output root.
    pub directory_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory_prefix: "stamped".to_string(),
        }
    }
}

/// Parse `#rrggbb` (case-insensitive) into RGB.
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(StampConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<StampConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StampConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit TOML file, or the stock defaults when `path` is `None`.
///
/// A path that does not exist is an error: the user asked for that file.
pub fn load_config(path: Option<&Path>) -> Result<StampConfig, ConfigError> {
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `stamp.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photo-stamp configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Caption band placement
# ---------------------------------------------------------------------------
[layout]
# Sources at least this tall (height / width) get a vertical caption strip
# on the right instead of a band along the bottom.
right_mode_aspect = 1.8

# Minimum band thickness in font sizes. Widened automatically so two lines,
# the gap between them and both edge margins always fit.
band_multiple = 3.0

# ---------------------------------------------------------------------------
# Typography (all spacing is relative to the font size)
# ---------------------------------------------------------------------------
[typography]
# Font size as a fraction of the canvas height.
font_ratio = 0.03
line_height_ratio = 1.25
line_gap_ratio = 0.35
# Distance kept between caption text and the canvas edges.
edge_margin_ratio = 0.75
# Minimum space between the place/description text and the date.
min_gap_ratio = 1.5
# Placed between location and description.
separator = "  "
latin_family = "Helvetica Neue, Arial, DejaVu Sans"
cjk_family = "PingFang SC, Noto Sans CJK SC, Source Han Sans SC, Microsoft YaHei"
# Extra directories with .ttf/.otf/.ttc files.
font_dirs = []

# ---------------------------------------------------------------------------
# Content bounds detection (photos that already carry a white margin)
# ---------------------------------------------------------------------------
[detection]
max_sample_edge = 320
# Corners darker than this (mean RGB, 0-255) disable detection.
brightness_floor = 200.0
# Corners that disagree by more than this RGB distance disable detection.
corner_variance_ceiling = 24.0
# Pixels farther than this from the corner color count as content.
pixel_diff_threshold = 48.0
# Content must be inset by at least this fraction on some side.
min_inset_ratio = 0.02

# ---------------------------------------------------------------------------
# Colors
# ---------------------------------------------------------------------------
[colors]
background = "#ffffff"
text = "#333333"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG quality (1-100). PNG output is lossless.
quality = 92

[preview]
# Preview canvas size relative to the print size.
scale = 0.25

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[processing]
# Photos rendered concurrently during export.
# Omit for strictly sequential export (lowest memory use).
# max_workers = 2

[export]
# Each run writes into <output>/<prefix>-<size>, or -2, -3, ... if taken.
directory_prefix = "stamped"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = StampConfig::default();
        assert_eq!(config.layout.right_mode_aspect, 1.8);
        assert_eq!(config.detection.max_sample_edge, 320);
        assert_eq!(config.colors.background, "#ffffff");
        assert_eq!(config.output.quality, 92);
        assert_eq!(config.processing.max_workers, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[colors]
background = "#fafafa"
"##;
        let config: StampConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.colors.background, "#fafafa");
        // Defaults preserved
        assert_eq!(config.colors.text, "#333333");
        assert_eq!(config.typography.font_ratio, 0.03);
    }

    #[test]
    fn parse_hex_color_accepts_rrggbb_only() {
        assert_eq!(parse_hex_color("#ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("#1A2b3C"), Some([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
    }

    #[test]
    fn background_rgb_falls_back_to_white() {
        let colors = ColorConfig {
            background: "nope".into(),
            ..ColorConfig::default()
        };
        assert_eq!(colors.background_rgb(), [255, 255, 255]);
    }

    // =========================================================================
    // effective_workers
    // =========================================================================

    #[test]
    fn effective_workers_defaults_to_sequential() {
        assert_eq!(effective_workers(&ProcessingConfig::default()), 1);
    }

    #[test]
    fn effective_workers_clamped_to_cores() {
        let config = ProcessingConfig {
            max_workers: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&config), cores);
    }

    // =========================================================================
    // merge / load
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[output]
quality = 92

[preview]
scale = 0.25
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[output]
quality = 80
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["output"]["quality"].as_integer(), Some(80));
        assert_eq!(merged["preview"]["scale"].as_float(), Some(0.25));
    }

    #[test]
    fn load_config_without_path_is_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, StampConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stamp.toml");
        fs::write(
            &path,
            r##"
[detection]
brightness_floor = 215.0

[processing]
max_workers = 2
"##,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.detection.brightness_floor, 215.0);
        assert_eq!(config.processing.max_workers, Some(2));
        assert_eq!(config.detection.pixel_diff_threshold, 48.0);
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[layout]\nbogus = 1").unwrap();
        assert!(resolve_config(Some(overlay)).is_err());
    }

    // =========================================================================
    // validate
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(StampConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_quality() {
        let mut config = StampConfig::default();
        config.output.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.output.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_font_ratio() {
        let mut config = StampConfig::default();
        config.typography.font_ratio = 0.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("typography.font_ratio"), "{err}");
    }

    #[test]
    fn validate_rejects_preview_scale_above_one() {
        let mut config = StampConfig::default();
        config.preview.scale = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_color() {
        let mut config = StampConfig::default();
        config.colors.text = "black".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nested_prefix() {
        let mut config = StampConfig::default();
        config.export.directory_prefix = "a/b".into();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: StampConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, StampConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for section in [
            "layout",
            "typography",
            "detection",
            "colors",
            "output",
            "preview",
            "processing",
            "export",
        ] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
