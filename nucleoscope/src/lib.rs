//! Nucleoscope - fluorescence nucleus segmentation and measurement.
//!
//! Processes microscopy images of plant nuclei:
//! - Metadata inference from file and folder names
//! - Normalization of TIFF stacks and RGB images to 8-bit planes
//! - Spot segmentation with a local Gaussian threshold and morphological cleanup
//! - Per-image aggregation and seedling-level replicate statistics
//! - SQLite and CSV result sinks, segmentation panels and bar charts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nucleoscope::{Pipeline, PipelineConfig, SqliteSink};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let mut sink = SqliteSink::open(Path::new("out/results.db"))?;
//! let report = pipeline.run_batch(Path::new("raw"), Path::new("out"), &mut sink);
//!
//! println!("{} processed, {} failed", report.processed.len(), report.failed.len());
//! ```

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod image_io;
pub mod metadata;
pub mod normalize;
pub mod report;
pub mod segmentation;
pub mod sink;
pub mod visualize;

// ============================================================================
// Pipeline
// ============================================================================

pub use batch::{discover_images, BatchReport, FileFailure, FileReport, Pipeline, ProcessError};
pub use config::{ConfigError, OutputConfig, PipelineConfig};

// ============================================================================
// Stages
// ============================================================================

pub use aggregate::{ConditionStats, ImageSummary, ReplicateSet, SummaryRecord};
pub use image_io::{load_raw, LoadError, RawImage};
pub use metadata::{Acquisition, Genotype, ImageMetadata, Region};
pub use normalize::{normalize, NormalizedImage};
pub use segmentation::{
    segment, BinaryMask, Connectivity, LabelMap, SegmentationConfig, Segmentation, SpotMeasurement,
    SpotSegmenter,
};

// ============================================================================
// Output
// ============================================================================

pub use report::{generate_report, ReportError};
pub use sink::{ImageRecord, MemorySink, MultiSink, PersistenceError, ResultSink, SqliteSink, SummaryCsvSink};
