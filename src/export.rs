//! Batch export.
//!
//! Drives [`StampEngine::render`] over a list of photos at full print
//! resolution and writes the results into a fresh run directory.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──start──▶ Running ──(one ItemFinished per item)──▶ Completed
//! ```
//!
//! A run never aborts because of a single photo: decode, encode and write
//! failures are counted and the next item is processed. The only fatal error
//! is failing to create the run directory itself.
//!
//! ## Workers
//!
//! By default items are rendered strictly one after another, which keeps at
//! most one decoded photo in memory. With `processing.max_workers = N`,
//! items are rendered in chunks of N on a private rayon pool. Writing files,
//! counting and progress events always happen in item order on the calling
//! thread, so the event stream and the totals are the same either way.
//!
//! ## Progress
//!
//! Events go over an optional `std::sync::mpsc::Sender`. A disconnected
//! receiver is ignored; export keeps going.

use crate::compose::{RenderError, RenderOptions, StampEngine};
use crate::config::effective_workers;
use crate::imaging::{ImageBackend, SourceInput};
use crate::naming::{
    output_relative_path, run_directory_name, source_format, unique_directory, unique_output_path,
};
use crate::types::{CaptionMetadata, TargetSize};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// One photo to export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    /// Source path relative to the source root. Its directory part is
    /// recreated under the run directory.
    pub source_relative_path: PathBuf,
    /// Output file name without extension.
    #[serde(default)]
    pub output_filename_stem: String,
    #[serde(default)]
    pub caption: CaptionMetadata,
}

/// Result of a finished run. `exported_count + failed_count == total_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub exported_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    Idle,
    Running,
    Completed,
}

/// Outcome of a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Exported { output: PathBuf },
    Failed { reason: String },
}

/// Progress events, in the order they are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Started {
        total: usize,
        output_dir: PathBuf,
    },
    ItemFinished {
        /// 1-based position of the item in the batch.
        current: usize,
        total: usize,
        /// Output file name, e.g. `outing.jpg`.
        filename: String,
        status: ItemStatus,
    },
    Completed(ExportSummary),
}

/// Counters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportState {
    pub phase: ExportPhase,
    pub total: usize,
    pub exported: usize,
    pub failed: usize,
}

impl Default for ExportState {
    fn default() -> Self {
        Self {
            phase: ExportPhase::Idle,
            total: 0,
            exported: 0,
            failed: 0,
        }
    }
}

impl ExportState {
    pub fn start(&mut self, total: usize) {
        *self = Self {
            phase: ExportPhase::Running,
            total,
            ..Self::default()
        };
    }

    /// Count one finished item and return its 1-based position.
    pub fn record(&mut self, status: &ItemStatus) -> usize {
        match status {
            ItemStatus::Exported { .. } => self.exported += 1,
            ItemStatus::Failed { .. } => self.failed += 1,
        }
        self.processed()
    }

    pub fn processed(&self) -> usize {
        self.exported + self.failed
    }

    pub fn finish(&mut self, output_dir: PathBuf) -> ExportSummary {
        self.phase = ExportPhase::Completed;
        ExportSummary {
            exported_count: self.exported,
            failed_count: self.failed,
            total_count: self.total,
            output_dir,
        }
    }
}

fn send(progress: Option<&Sender<ExportEvent>>, event: ExportEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

/// Everything needed to render and write one item, computed up front.
struct PreparedItem<'a> {
    item: &'a ExportItem,
    source: PathBuf,
    relative_output: PathBuf,
    options: RenderOptions,
}

impl PreparedItem<'_> {
    fn filename(&self) -> String {
        self.relative_output
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl<B: ImageBackend> StampEngine<B> {
    /// Export `items` at `target` into a new run directory under `output_root`.
    ///
    /// Source paths are resolved against `source_root`. Exactly one
    /// `ItemFinished` event is sent per item, successful or not.
    #[tracing::instrument(skip_all, fields(target = %target, items = items.len()))]
    pub fn export_batch(
        &self,
        items: &[ExportItem],
        target: TargetSize,
        source_root: &Path,
        output_root: &Path,
        progress: Option<Sender<ExportEvent>>,
    ) -> Result<ExportSummary, ExportError> {
        let config = self.config();
        let name = run_directory_name(&config.export.directory_prefix, target);
        let output_dir = unique_directory(output_root, &name);
        fs::create_dir_all(&output_dir)?;

        let mut state = ExportState::default();
        state.start(items.len());
        tracing::info!(output_dir = %output_dir.display(), "export started");
        send(
            progress.as_ref(),
            ExportEvent::Started {
                total: items.len(),
                output_dir: output_dir.clone(),
            },
        );

        let mut taken = HashSet::new();
        let prepared: Vec<PreparedItem> = items
            .iter()
            .map(|item| {
                let source = source_root.join(&item.source_relative_path);
                let format = source_format(&source);
                let wanted = output_relative_path(
                    &item.source_relative_path,
                    &item.output_filename_stem,
                    format,
                );
                let relative_output = unique_output_path(wanted.clone(), &mut taken);
                if relative_output != wanted {
                    tracing::warn!(
                        wanted = %wanted.display(),
                        renamed = %relative_output.display(),
                        "output name already used in this run"
                    );
                }
                PreparedItem {
                    item,
                    relative_output,
                    source,
                    options: RenderOptions::export(format, config),
                }
            })
            .collect();

        let workers = effective_workers(&config.processing);
        let pool = if workers > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| tracing::warn!(error = %e, "worker pool unavailable, exporting sequentially"))
                .ok()
        } else {
            None
        };

        for chunk in prepared.chunks(workers) {
            let rendered: Vec<Result<Vec<u8>, RenderError>> = match &pool {
                Some(pool) => pool.install(|| {
                    chunk
                        .par_iter()
                        .map(|p| self.render_item(p, target))
                        .collect()
                }),
                None => chunk.iter().map(|p| self.render_item(p, target)).collect(),
            };

            for (p, result) in chunk.iter().zip(rendered) {
                let output = output_dir.join(&p.relative_output);
                let outcome = result
                    .map_err(ExportError::from)
                    .and_then(|bytes| write_output(&output, &bytes));
                let status = match outcome {
                    Ok(()) => ItemStatus::Exported { output },
                    Err(e) => {
                        tracing::warn!(
                            source = %p.source.display(),
                            error = %e,
                            "export item failed"
                        );
                        ItemStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                let current = state.record(&status);
                send(
                    progress.as_ref(),
                    ExportEvent::ItemFinished {
                        current,
                        total: state.total,
                        filename: p.filename(),
                        status,
                    },
                );
            }
        }

        let summary = state.finish(output_dir);
        tracing::info!(
            exported = summary.exported_count,
            failed = summary.failed_count,
            "export completed"
        );
        send(progress.as_ref(), ExportEvent::Completed(summary.clone()));
        Ok(summary)
    }

    fn render_item(&self, p: &PreparedItem, target: TargetSize) -> Result<Vec<u8>, RenderError> {
        self.render(
            &SourceInput::Path(p.source.clone()),
            None,
            target,
            &p.item.caption,
            &p.options,
        )
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StampConfig;
    use crate::imaging::TextRasterizer;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use std::sync::Arc;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn engine(backend: MockBackend, config: StampConfig) -> StampEngine<MockBackend> {
        let rasterizer = TextRasterizer::with_database(Arc::new(usvg::fontdb::Database::new()));
        StampEngine::with_parts(backend, rasterizer, config)
    }

    fn item(rel: &str, stem: &str) -> ExportItem {
        ExportItem {
            source_relative_path: rel.into(),
            output_filename_stem: stem.into(),
            caption: CaptionMetadata {
                date: Some("2024-05-01".into()),
                location: "Shanghai".into(),
                description: String::new(),
            },
        }
    }

    /// Mock backend knowing `rels` under `root`, all 4000×3000.
    fn backend_for(root: &Path, rels: &[&str]) -> MockBackend {
        rels.iter().fold(MockBackend::new(), |b, rel| {
            b.with_source(&root.join(rel).display().to_string(), 4000, 3000)
        })
    }

    fn run(
        engine: &StampEngine<MockBackend>,
        items: &[ExportItem],
        source_root: &Path,
        output_root: &Path,
    ) -> (ExportSummary, Vec<ExportEvent>) {
        let (tx, rx) = mpsc::channel();
        let summary = engine
            .export_batch(items, TargetSize::SixL, source_root, output_root, Some(tx))
            .unwrap();
        (summary, rx.into_iter().collect())
    }

    #[test]
    fn one_bad_item_is_counted_and_skipped() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(
            backend_for(src.path(), &["a.jpg", "trip/b.jpg", "c.jpg"]),
            StampConfig::default(),
        );
        let items = vec![
            item("a.jpg", "a"),
            item("trip/b.jpg", "b"),
            item("missing.jpg", "missing"),
            item("c.jpg", "c"),
        ];
        let (summary, events) = run(&e, &items, src.path(), out.path());

        assert_eq!(summary.exported_count, 3);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.output_dir, out.path().join("stamped-6L"));
        assert!(summary.output_dir.join("a.jpg").exists());
        assert!(summary.output_dir.join("trip/b.jpg").exists());
        assert!(!summary.output_dir.join("missing.jpg").exists());

        let finished: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ExportEvent::ItemFinished {
                    current,
                    total,
                    filename,
                    status,
                } => Some((*current, *total, filename.clone(), status.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 4);
        assert_eq!(
            finished.iter().map(|f| f.0).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(finished.iter().all(|f| f.1 == 4));
        assert_eq!(finished[2].2, "missing.jpg");
        assert!(matches!(finished[2].3, ItemStatus::Failed { .. }));
        assert!(matches!(events.first(), Some(ExportEvent::Started { total: 4, .. })));
        assert!(matches!(events.last(), Some(ExportEvent::Completed(s)) if *s == summary));
    }

    #[test]
    fn written_bytes_come_from_the_render() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(backend_for(src.path(), &["a.jpg"]), StampConfig::default());
        let (summary, _) = run(&e, &[item("a.jpg", "outing")], src.path(), out.path());
        let bytes = fs::read(summary.output_dir.join("outing.jpg")).unwrap();
        assert_eq!(bytes, b"jpeg:1800x1350");
    }

    #[test]
    fn png_sources_export_as_png() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(backend_for(src.path(), &["scans/s.PNG"]), StampConfig::default());
        let (summary, _) = run(&e, &[item("scans/s.PNG", "s")], src.path(), out.path());
        let bytes = fs::read(summary.output_dir.join("scans/s.png")).unwrap();
        assert_eq!(bytes, b"png:1800x1350");
    }

    #[test]
    fn colliding_stems_do_not_overwrite() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(
            backend_for(src.path(), &["trip/a.jpg", "trip/b.jpg"]),
            StampConfig::default(),
        );
        let items = [item("trip/a.jpg", "outing"), item("trip/b.jpg", "outing")];
        let (summary, events) = run(&e, &items, src.path(), out.path());

        assert_eq!(summary.exported_count, 2);
        let outputs: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ExportEvent::ItemFinished {
                    status: ItemStatus::Exported { output },
                    ..
                } => Some(output.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            outputs,
            vec![
                summary.output_dir.join("trip/outing.jpg"),
                summary.output_dir.join("trip/outing-2.jpg"),
            ]
        );
        assert!(outputs.iter().all(|p| p.exists()));
    }

    #[test]
    fn export_uses_configured_quality() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mut config = StampConfig::default();
        config.output.quality = 70;
        let e = engine(backend_for(src.path(), &["a.jpg"]), config);
        run(&e, &[item("a.jpg", "a")], src.path(), out.path());
        let qualities: Vec<_> = e
            .backend()
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Encode { quality, .. } => Some(quality),
                _ => None,
            })
            .collect();
        assert_eq!(qualities, vec![70]);
    }

    #[test]
    fn second_run_gets_a_fresh_directory() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(backend_for(src.path(), &["a.jpg"]), StampConfig::default());
        let items = [item("a.jpg", "a")];
        let (first, _) = run(&e, &items, src.path(), out.path());
        let (second, _) = run(&e, &items, src.path(), out.path());
        assert_eq!(first.output_dir, out.path().join("stamped-6L"));
        assert_eq!(second.output_dir, out.path().join("stamped-6L-2"));
    }

    #[test]
    fn empty_batch_completes() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(MockBackend::new(), StampConfig::default());
        let (summary, events) = run(&e, &[], src.path(), out.path());
        assert_eq!(summary.total_count, 0);
        assert_eq!(events.len(), 2);
        assert!(summary.output_dir.is_dir());
    }

    #[test]
    fn worker_pool_keeps_order_and_totals() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let rels = ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"];
        let mut config = StampConfig::default();
        config.processing.max_workers = Some(3);
        let e = engine(backend_for(src.path(), &rels), config);

        let mut items: Vec<_> = rels.iter().map(|r| item(r, r.trim_end_matches(".jpg"))).collect();
        items.insert(2, item("nope.jpg", "nope"));
        let (summary, events) = run(&e, &items, src.path(), out.path());

        assert_eq!(
            (summary.exported_count, summary.failed_count, summary.total_count),
            (5, 1, 6)
        );
        let names: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ExportEvent::ItemFinished { filename, .. } => Some(filename.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["1.jpg", "2.jpg", "nope.jpg", "3.jpg", "4.jpg", "5.jpg"]);
    }

    #[test]
    fn dropped_receiver_does_not_stop_export() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let e = engine(backend_for(src.path(), &["a.jpg"]), StampConfig::default());
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let summary = e
            .export_batch(&[item("a.jpg", "a")], TargetSize::Five, src.path(), out.path(), Some(tx))
            .unwrap();
        assert_eq!(summary.exported_count, 1);
        assert_eq!(summary.output_dir, out.path().join("stamped-5"));
    }

    #[test]
    fn unwritable_output_root_is_io_error() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let file_root = out.path().join("not-a-dir");
        fs::write(&file_root, b"").unwrap();
        let e = engine(MockBackend::new(), StampConfig::default());
        let result = e.export_batch(&[item("a.jpg", "a")], TargetSize::SixL, src.path(), &file_root, None);
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[test]
    fn state_tracks_phase_and_counts() {
        let mut state = ExportState::default();
        assert_eq!(state.phase, ExportPhase::Idle);
        state.start(2);
        assert_eq!(state.phase, ExportPhase::Running);
        assert_eq!(state.record(&ItemStatus::Failed { reason: "x".into() }), 1);
        assert_eq!(
            state.record(&ItemStatus::Exported {
                output: "a.jpg".into()
            }),
            2
        );
        let summary = state.finish("out".into());
        assert_eq!(state.phase, ExportPhase::Completed);
        assert_eq!(summary.exported_count + summary.failed_count, summary.total_count);
    }

    #[test]
    fn items_deserialize_with_defaults() {
        let items: Vec<ExportItem> = serde_json::from_str(
            r#"[{"source_relative_path": "2024/a.jpg", "caption": {"date": "2024-05-01"}}]"#,
        )
        .unwrap();
        assert_eq!(items[0].output_filename_stem, "");
        assert_eq!(items[0].caption.date.as_deref(), Some("2024-05-01"));
    }
}
