//! Condition report from a flat image summary.
//!
//! For each replicate set (z-slices, stacks) the summary rows are reduced to
//! per-condition statistics, written as CSV and drawn as a bar chart.

use std::path::{Path, PathBuf};

use strum::IntoEnumIterator;
use thiserror::Error;

use crate::aggregate::{aggregate_conditions, ConditionStats, ReplicateSet};
use crate::sink::{read_summary_records, PersistenceError};
use crate::visualize::{self, VisualizeError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Visualize(#[from] VisualizeError),
}

/// Files written for one replicate set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateReport {
    pub set: ReplicateSet,
    pub stats: Vec<ConditionStats>,
    pub stats_csv: PathBuf,
    pub chart: PathBuf,
}

/// Write `condition_stats_<set>.csv` and `bar_<set>.png` for both replicate sets.
pub fn generate_report(summary_csv: &Path, output_dir: &Path) -> Result<Vec<ReplicateReport>, ReportError> {
    let records = read_summary_records(summary_csv)?;
    tracing::info!(
        "Read {} summary rows from '{}'",
        records.len(),
        summary_csv.display()
    );

    let mut reports = Vec::new();
    for set in ReplicateSet::iter() {
        let stats = aggregate_conditions(&records, set);
        if stats.is_empty() {
            tracing::warn!("No {set} records with a seedling number; writing empty report");
        }

        let stats_csv = output_dir.join(format!("condition_stats_{set}.csv"));
        write_condition_stats(&stats_csv, &stats)?;

        let chart = output_dir.join(format!("bar_{set}.png"));
        visualize::save_rgb(&visualize::render_bar_chart(&stats), &chart)?;

        reports.push(ReplicateReport {
            set,
            stats,
            stats_csv,
            chart,
        });
    }
    Ok(reports)
}

/// Write condition statistics as CSV; missing standard errors are empty cells.
pub fn write_condition_stats(path: &Path, stats: &[ConditionStats]) -> Result<(), PersistenceError> {
    let csv_err = |source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    if stats.is_empty() {
        writer
            .write_record([
                "region",
                "genotype",
                "seedlings",
                "integrated_intensity_mean",
                "integrated_intensity_sem",
                "total_area_mean",
                "total_area_sem",
            ])
            .map_err(csv_err)?;
    }
    for row in stats {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}
