//! Output naming for export runs.
//!
//! Every export run writes into its own directory under the output root:
//!
//! ```text
//! exports/
//! ├── stamped-6L/          # first run at 6L
//! │   ├── 2024/
//! │   │   └── outing.jpg   # from 2024/IMG_0001.JPG, stem "outing"
//! │   └── scan.png         # PNG sources stay PNG
//! └── stamped-6L-2/        # second run, never overwrites the first
//! ```
//!
//! The output format follows the source kind so that lossless sources stay
//! lossless: `.png` for PNG sources, `.jpg` for everything else.

use crate::imaging::OutputFormat;
use crate::types::TargetSize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Base name of the run directory, e.g. `stamped-6L`.
pub fn run_directory_name(prefix: &str, target: TargetSize) -> String {
    format!("{}-{}", prefix, target.id())
}

/// First of `root/name`, `root/name-2`, `root/name-3`, … that does not exist yet.
pub fn unique_directory(root: &Path, name: &str) -> PathBuf {
    let first = root.join(name);
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| root.join(format!("{name}-{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

/// Output format matching the source kind.
///
/// The extension decides when it is recognized; otherwise the first bytes
/// of the file are sniffed. Unknown or unreadable sources export as JPEG.
pub fn source_format(path: &Path) -> OutputFormat {
    if let Some(format) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_extension)
    {
        return format;
    }
    sniff_format(path).unwrap_or(OutputFormat::Jpeg)
}

fn sniff_format(path: &Path) -> Option<OutputFormat> {
    let mut header = [0u8; 16];
    let mut file = File::open(path).ok()?;
    let n = file.read(&mut header).ok()?;
    match image::guess_format(&header[..n]).ok()? {
        image::ImageFormat::Png => Some(OutputFormat::Png),
        image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        _ => None,
    }
}

/// Path of an exported file relative to the run directory.
///
/// Keeps the directory part of `source_relative` (dropping `..`, root and
/// `.` components so nothing escapes the run directory) and names the file
/// `<stem>.<ext>`. A blank stem falls back to the source file stem.
pub fn output_relative_path(source_relative: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    let mut out: PathBuf = source_relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part),
                    _ => None,
                })
                .collect::<PathBuf>()
        })
        .unwrap_or_default();

    let stem = stem.trim();
    let stem = if stem.is_empty() {
        source_relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string())
    } else {
        stem.replace(['/', '\\'], "_")
    };
    out.push(format!("{stem}.{}", format.extension()));
    out
}

/// `path` if no earlier item in the run claimed it, otherwise the first free
/// `<stem>-2.<ext>`, `<stem>-3.<ext>`, … next to it. The result is added to
/// `taken`.
pub fn unique_output_path(path: PathBuf, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if taken.insert(path.clone()) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let unique = (2u32..)
        .map(|n| parent.join(format!("{stem}-{n}.{ext}")))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(path);
    taken.insert(unique.clone());
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{uniform_photo, write_jpeg, write_png};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn run_directory_uses_target_id() {
        assert_eq!(run_directory_name("stamped", TargetSize::SixL), "stamped-6L");
        assert_eq!(run_directory_name("print", TargetSize::Five), "print-5");
    }

    #[test]
    fn unique_directory_appends_counter() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        assert_eq!(unique_directory(root, "stamped-6L"), root.join("stamped-6L"));
        fs::create_dir(root.join("stamped-6L")).unwrap();
        assert_eq!(unique_directory(root, "stamped-6L"), root.join("stamped-6L-2"));
        fs::create_dir(root.join("stamped-6L-2")).unwrap();
        assert_eq!(unique_directory(root, "stamped-6L"), root.join("stamped-6L-3"));
    }

    #[test]
    fn unique_directory_treats_files_as_taken() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stamped-7"), b"").unwrap();
        assert_eq!(
            unique_directory(tmp.path(), "stamped-7"),
            tmp.path().join("stamped-7-2")
        );
    }

    #[test]
    fn source_format_from_extension() {
        assert_eq!(source_format(Path::new("a/b.PNG")), OutputFormat::Png);
        assert_eq!(source_format(Path::new("a/b.jpeg")), OutputFormat::Jpeg);
        assert_eq!(source_format(Path::new("missing.heic")), OutputFormat::Jpeg);
    }

    #[test]
    fn source_format_sniffs_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let photo = uniform_photo(8, 8, [120, 40, 40]);
        let path = write_png(tmp.path(), "scan.bin", &photo);
        assert_eq!(source_format(&path), OutputFormat::Png);

        let path = write_jpeg(tmp.path(), "noext", &photo);
        assert_eq!(source_format(&path), OutputFormat::Jpeg);

        let path = tmp.path().join("junk.dat");
        fs::write(&path, b"not a photo").unwrap();
        assert_eq!(source_format(&path), OutputFormat::Jpeg);
    }

    #[test]
    fn output_path_keeps_subdirectories() {
        let p = output_relative_path(Path::new("2024/May/IMG_0001.JPG"), "outing", OutputFormat::Jpeg);
        assert_eq!(p, PathBuf::from("2024/May/outing.jpg"));
    }

    #[test]
    fn output_path_at_root() {
        let p = output_relative_path(Path::new("scan.png"), "scan", OutputFormat::Png);
        assert_eq!(p, PathBuf::from("scan.png"));
    }

    #[test]
    fn output_path_blank_stem_uses_source_stem() {
        let p = output_relative_path(Path::new("trip/IMG_7.png"), "  ", OutputFormat::Png);
        assert_eq!(p, PathBuf::from("trip/IMG_7.png"));
    }

    #[test]
    fn output_path_cannot_escape_run_directory() {
        let p = output_relative_path(Path::new("../../etc/x.jpg"), "a/../b", OutputFormat::Jpeg);
        assert_eq!(p, PathBuf::from("etc/a_.._b.jpg"));
        let p = output_relative_path(Path::new("/abs/dir/x.jpg"), "x", OutputFormat::Jpeg);
        assert_eq!(p, PathBuf::from("abs/dir/x.jpg"));
    }

    #[test]
    fn colliding_outputs_get_numbered() {
        let mut taken = HashSet::new();
        let a = unique_output_path(PathBuf::from("2024/outing.jpg"), &mut taken);
        let b = unique_output_path(PathBuf::from("2024/outing.jpg"), &mut taken);
        let c = unique_output_path(PathBuf::from("2024/outing.jpg"), &mut taken);
        let d = unique_output_path(PathBuf::from("2025/outing.jpg"), &mut taken);
        assert_eq!(a, PathBuf::from("2024/outing.jpg"));
        assert_eq!(b, PathBuf::from("2024/outing-2.jpg"));
        assert_eq!(c, PathBuf::from("2024/outing-3.jpg"));
        assert_eq!(d, PathBuf::from("2025/outing.jpg"));
    }

    #[test]
    fn numbered_output_skips_names_already_claimed() {
        let mut taken = HashSet::new();
        unique_output_path(PathBuf::from("x-2.png"), &mut taken);
        unique_output_path(PathBuf::from("x.png"), &mut taken);
        assert_eq!(
            unique_output_path(PathBuf::from("x.png"), &mut taken),
            PathBuf::from("x-3.png")
        );
    }
}
