use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::{ImageRecord, PersistenceError, ResultSink};
use crate::aggregate::SummaryRecord;

/// Append-only CSV of [`SummaryRecord`] rows.
///
/// The header is written only when the file is new or empty, so repeated
/// runs keep appending to the same table.
pub struct SummaryCsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SummaryCsvSink {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let needs_header = match std::fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_err(&self, source: csv::Error) -> PersistenceError {
        PersistenceError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl ResultSink for SummaryCsvSink {
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        let row = record.summary.to_record();
        if let Err(e) = self.writer.serialize(&row) {
            return Err(self.csv_err(e));
        }
        // Each row is flushed so an aborted batch leaves a complete file
        self.writer.flush().map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.writer.flush().map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Read every row of a summary CSV.
pub fn read_summary_records(path: &Path) -> Result<Vec<SummaryRecord>, PersistenceError> {
    let csv_err = |source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<SummaryRecord>, _>>()
        .map_err(csv_err)
}
