//! Destinations for per-image results.
//!
//! Every processed image is handed to a [`ResultSink`] as one [`ImageRecord`]:
//! the spot-level rows, the image-level totals and the flat summary row all
//! derive from it. Sinks are append-only.

mod error;
mod sqlite;
mod summary_csv;

pub use error::PersistenceError;
pub use sqlite::SqliteSink;
pub use summary_csv::{read_summary_records, SummaryCsvSink};

use crate::aggregate::ImageSummary;
use crate::metadata::ImageMetadata;
use crate::segmentation::SpotMeasurement;

/// Everything persisted for one image.
#[derive(Debug, Clone, Copy)]
pub struct ImageRecord<'a> {
    pub summary: &'a ImageSummary,
    pub spots: &'a [SpotMeasurement],
}

impl<'a> ImageRecord<'a> {
    pub fn new(summary: &'a ImageSummary, spots: &'a [SpotMeasurement]) -> Self {
        Self { summary, spots }
    }

    pub fn metadata(&self) -> &'a ImageMetadata {
        &self.summary.metadata
    }
}

/// Append-only result destination.
pub trait ResultSink: Send {
    /// Append all rows of one image.
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError>;

    /// Push buffered rows to the destination.
    fn flush(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        (**self).write(record)
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        (**self).flush()
    }
}

/// Fans each record out to several sinks in order. Stops at the first failure.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for MultiSink {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        for sink in &mut self.sinks {
            sink.write(record)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Keeps owned copies of everything written. Used by tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub summaries: Vec<ImageSummary>,
    pub spots: Vec<Vec<SpotMeasurement>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

impl ResultSink for MemorySink {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        self.summaries.push(record.summary.clone());
        self.spots.push(record.spots.to_vec());
        Ok(())
    }
}
