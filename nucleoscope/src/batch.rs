//! Batch driver: discovery, per-file pipeline and failure isolation.
//!
//! Each file runs metadata → load → normalize → segment → aggregate →
//! persist → optional panel. A failing file is logged and recorded in the
//! [`BatchReport`]; it never stops the batch. Once a file's results are
//! persisted it counts as processed, even if its panel cannot be saved.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::ImageSummary;
use crate::config::PipelineConfig;
use crate::image_io::{self, LoadError, TIFF_EXTENSIONS};
use crate::metadata::ImageMetadata;
use crate::normalize::{self, NormalizedImage};
use crate::segmentation::{Segmentation, SpotSegmenter};
use crate::sink::{ImageRecord, PersistenceError, ResultSink};
use crate::visualize::{self, VisualizeError};

/// Suffix of segmentation panel file names.
pub const PANEL_SUFFIX: &str = "_seg.png";

/// Why one file could not be processed.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Processing panicked: {0}")]
    Panicked(String),
}

/// In-memory result of analyzing one image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub normalized: NormalizedImage,
    pub segmentation: Segmentation,
    pub summary: ImageSummary,
}

/// A successfully processed file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub spot_count: usize,
    pub total_area: u64,
    pub mean_intensity: f64,
    pub panel: Option<PathBuf>,
}

/// A file that failed, with the rendered error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a whole batch, sorted by path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn push(&mut self, path: PathBuf, outcome: Result<FileReport, ProcessError>) {
        match outcome {
            Ok(report) => self.processed.push(report),
            Err(e) => self.failed.push(FileFailure {
                path,
                error: e.to_string(),
            }),
        }
    }
}

/// All TIFF files below `root` (any extension case), sorted.
pub fn discover_images(root: &Path) -> Vec<PathBuf> {
    common::file_utils::files_with_extensions_recursive(root, TIFF_EXTENSIONS)
}

/// `<output_dir>/<path relative to root, parent only>/<stem>_seg.png`.
pub fn panel_path(root: &Path, path: &Path, output_dir: &Path) -> PathBuf {
    let relative_dir = path
        .parent()
        .and_then(|p| p.strip_prefix(root).ok())
        .unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(relative_dir).join(format!("{stem}{PANEL_SUFFIX}"))
}

/// Configured per-file pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    segmenter: SpotSegmenter,
}

impl Pipeline {
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Self {
        config.validate();
        let segmenter = SpotSegmenter::from_config(config.segmentation);
        Self { config, segmenter }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, normalize, segment and aggregate one image. Writes nothing.
    pub fn analyze(&self, path: &Path) -> Result<ImageAnalysis, ProcessError> {
        let metadata = ImageMetadata::from_path(path, &self.config.acquisition);
        let raw = image_io::load_raw(path)?;
        let normalized = normalize::normalize(raw)?;
        let segmentation = self.segmenter.segment(&normalized);
        let summary = ImageSummary::from_spots(metadata, &segmentation.spots);

        Ok(ImageAnalysis {
            normalized,
            segmentation,
            summary,
        })
    }

    /// Analyze `path`, persist it to `sink` and render its panel.
    pub fn process_file<S: ResultSink + ?Sized>(
        &self,
        root: &Path,
        path: &Path,
        output_dir: &Path,
        sink: &Mutex<&mut S>,
    ) -> Result<FileReport, ProcessError> {
        let analysis = self.analyze(path)?;
        let ImageAnalysis {
            segmentation,
            summary,
            ..
        } = &analysis;

        sink.lock()
            .write(&ImageRecord::new(summary, &segmentation.spots))?;

        let panel = if self.config.output.visualize {
            match self.save_panel(root, path, output_dir, &analysis) {
                Ok(panel_file) => Some(panel_file),
                Err(e) => {
                    tracing::warn!("No panel for '{}': {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(
            "Processed '{}': {} spots, total area {}",
            path.display(),
            segmentation.spot_count(),
            summary.total_area
        );

        Ok(FileReport {
            path: path.to_path_buf(),
            spot_count: segmentation.spot_count(),
            total_area: summary.total_area,
            mean_intensity: summary.mean_intensity,
            panel,
        })
    }

    fn save_panel(
        &self,
        root: &Path,
        path: &Path,
        output_dir: &Path,
        analysis: &ImageAnalysis,
    ) -> Result<PathBuf, VisualizeError> {
        let panel_file = panel_path(root, path, output_dir);
        let image = visualize::render_panel(
            &analysis.normalized,
            &analysis.segmentation.mask,
            Some(&analysis.segmentation.labels),
            self.config.output.panel_size,
        );
        visualize::save_rgb(&image, &panel_file)?;
        Ok(panel_file)
    }

    /// Process every image below `root`. Failures are logged and collected.
    pub fn run_batch<S: ResultSink + ?Sized>(
        &self,
        root: &Path,
        output_dir: &Path,
        sink: &mut S,
    ) -> BatchReport {
        let files = discover_images(root);
        tracing::info!(
            "Found {} images under '{}'",
            files.len(),
            root.display()
        );
        self.run_files(root, &files, output_dir, sink)
    }

    /// Process an explicit file list. `root` only shapes panel output paths.
    pub fn run_files<S: ResultSink + ?Sized>(
        &self,
        root: &Path,
        files: &[PathBuf],
        output_dir: &Path,
        sink: &mut S,
    ) -> BatchReport {
        let sink = Mutex::new(sink);

        let process = |path: &PathBuf| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.process_file(root, path, output_dir, &sink)
            }))
            .unwrap_or_else(|payload| Err(ProcessError::Panicked(panic_message(payload.as_ref()))));

            if let Err(e) = &outcome {
                tracing::warn!("Skipping '{}': {}", path.display(), e);
            }
            (path.clone(), outcome)
        };

        let outcomes: Vec<(PathBuf, Result<FileReport, ProcessError>)> = if self.config.output.parallel {
            files.par_iter().map(process).collect()
        } else {
            files.iter().map(process).collect()
        };

        let mut report = BatchReport::default();
        for (path, outcome) in outcomes {
            report.push(path, outcome);
        }

        if let Err(e) = sink.lock().flush() {
            tracing::warn!("Failed to flush results: {e}");
        }

        tracing::info!(
            "Batch finished: {} processed, {} failed",
            report.processed.len(),
            report.failed.len()
        );
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_path_mirrors_folders() {
        let root = Path::new("/data/raw");
        let path = Path::new("/data/raw/control/meristem/seedling1_z3c1.tif");

        assert_eq!(
            panel_path(root, path, Path::new("/out")),
            PathBuf::from("/out/control/meristem/seedling1_z3c1_seg.png")
        );
    }

    #[test]
    fn test_panel_path_outside_root_goes_to_output_top() {
        let path = Path::new("/elsewhere/img.TIFF");
        assert_eq!(
            panel_path(Path::new("/data/raw"), path, Path::new("/out")),
            PathBuf::from("/out/img_seg.png")
        );
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::default();
        report.push(
            PathBuf::from("a.tif"),
            Ok(FileReport {
                path: PathBuf::from("a.tif"),
                spot_count: 1,
                total_area: 10,
                mean_intensity: 5.0,
                panel: None,
            }),
        );
        report.push(
            PathBuf::from("b.tif"),
            Err(ProcessError::Panicked("boom".to_string())),
        );

        assert_eq!(report.total(), 2);
        assert!(!report.is_success());
        assert_eq!(report.failed[0].error, "Processing panicked: boom");
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
