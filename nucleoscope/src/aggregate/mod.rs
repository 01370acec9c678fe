//! Per-image aggregation of spot measurements.

pub mod replicates;

pub use replicates::{
    aggregate_conditions, condition_stats, mean_and_sem, seedling_means, ConditionStats,
    ReplicateSet, SeedlingMean,
};

use serde::{Deserialize, Serialize};

use crate::metadata::{Genotype, ImageMetadata, Region};
use crate::segmentation::SpotMeasurement;

/// Totals of one image's spots.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSummary {
    pub metadata: ImageMetadata,
    pub spot_count: usize,
    /// Summed spot area in pixels.
    pub total_area: u64,
    pub total_integrated_intensity: f64,
    /// `total_integrated_intensity / total_area`, 0 when there are no spots.
    pub mean_intensity: f64,
}

impl ImageSummary {
    pub fn from_spots(metadata: ImageMetadata, spots: &[SpotMeasurement]) -> Self {
        let total_area: u64 = spots.iter().map(|s| s.area_pixels as u64).sum();
        let total_integrated_intensity: f64 = spots.iter().map(|s| s.integrated_intensity).sum();
        let mean_intensity = if total_area == 0 {
            0.0
        } else {
            total_integrated_intensity / total_area as f64
        };

        Self {
            metadata,
            spot_count: spots.len(),
            total_area,
            total_integrated_intensity,
            mean_intensity,
        }
    }

    /// Flat summary row for the append-only summary table.
    pub fn to_record(&self) -> SummaryRecord {
        SummaryRecord {
            filename: self.metadata.filename(),
            region: self.metadata.region,
            genotype: self.metadata.genotype,
            seedling: self.metadata.seedling,
            zslice: self.metadata.zslice,
            total_area: self.total_area,
            integrated_intensity: self.total_integrated_intensity,
            mean_intensity: self.mean_intensity,
        }
    }
}

/// One row of the flat image summary. Column order is the file's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub filename: String,
    pub region: Region,
    pub genotype: Genotype,
    pub seedling: Option<u32>,
    pub zslice: Option<u32>,
    pub total_area: u64,
    pub integrated_intensity: f64,
    pub mean_intensity: f64,
}
