//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Export
//!
//! ```text
//! Exporting 3 photos → exports/stamped-6L
//! 001 outing.jpg
//!     Saved: exports/stamped-6L/2024/outing.jpg
//! 002 harbour.jpg
//!     Failed: Decode failed: photos/harbour.jpg: unrecognized image data
//! 003 scan.png
//!     Saved: exports/stamped-6L/scan.png
//!
//! Exported 2 of 3 photos, 1 failed → exports/stamped-6L
//! ```
//!
//! ## Render
//!
//! ```text
//! out.jpg
//!     Canvas: 1800×1350 (bottom caption)
//!     Size: 412.3 KB
//! ```
//!
//! ## Sizes
//!
//! ```text
//! 5   1500×1050 px   5×3.5 in @ 300 DPI
//! 6L  1800×1350 px   6×4.5 in @ 300 DPI
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::compose::RenderPlan;
use crate::export::{ExportEvent, ExportSummary, ItemStatus};
use crate::types::{LayoutMode, TargetSize};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count.
fn format_bytes(n: usize) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n < KB {
        format!("{} B", n)
    } else if n < KB * KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{:.1} MB", n / (KB * KB))
    }
}

fn photo_count(n: usize) -> String {
    if n == 1 {
        "1 photo".to_string()
    } else {
        format!("{} photos", n)
    }
}

// ============================================================================
// Export
// ============================================================================

/// Format one export progress event.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Started { total, output_dir } => {
            vec![format!(
                "Exporting {} → {}",
                photo_count(*total),
                output_dir.display()
            )]
        }
        ExportEvent::ItemFinished {
            current,
            filename,
            status,
            ..
        } => {
            let detail = match status {
                ItemStatus::Exported { output } => format!("    Saved: {}", output.display()),
                ItemStatus::Failed { reason } => format!("    Failed: {}", reason),
            };
            vec![format!("{} {}", format_index(*current), filename), detail]
        }
        ExportEvent::Completed(summary) => {
            let mut lines = vec![String::new()];
            lines.extend(format_summary(summary));
            lines
        }
    }
}

/// Format the final line of an export run.
pub fn format_summary(summary: &ExportSummary) -> Vec<String> {
    let failed = if summary.failed_count > 0 {
        format!(", {} failed", summary.failed_count)
    } else {
        String::new()
    };
    vec![format!(
        "Exported {} of {}{} → {}",
        summary.exported_count,
        photo_count(summary.total_count),
        failed,
        summary.output_dir.display()
    )]
}

pub fn print_export_event(event: &ExportEvent) {
    for line in format_export_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format the result of a single render.
pub fn format_render_output(output: &Path, plan: &RenderPlan, byte_len: usize) -> Vec<String> {
    let mode = match plan.layout.mode {
        LayoutMode::Bottom if plan.layout.text_area.is_empty() => "no caption",
        LayoutMode::Bottom => "bottom caption",
        LayoutMode::Right => "right caption",
    };
    vec![
        output.display().to_string(),
        format!(
            "    Canvas: {}×{} ({})",
            plan.canvas.width, plan.canvas.height, mode
        ),
        format!("    Size: {}", format_bytes(byte_len)),
    ]
}

pub fn print_render_output(output: &Path, plan: &RenderPlan, byte_len: usize) {
    for line in format_render_output(output, plan, byte_len) {
        println!("{}", line);
    }
}

// ============================================================================
// Sizes
// ============================================================================

/// Format the print-size presets table.
pub fn format_sizes() -> Vec<String> {
    let dpi = TargetSize::DPI as f64;
    TargetSize::ALL
        .iter()
        .map(|t| {
            let (w, h) = t.pixels();
            format!(
                "{:<3} {}×{} px   {}×{} in @ {} DPI",
                t.id(),
                w,
                h,
                w as f64 / dpi,
                h as f64 / dpi,
                TargetSize::DPI
            )
        })
        .collect()
}

pub fn print_sizes() {
    for line in format_sizes() {
        println!("{}", line);
    }
}
