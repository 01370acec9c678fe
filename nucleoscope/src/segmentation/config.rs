//! Configuration types for spot segmentation.

use serde::{Deserialize, Serialize};

/// Pixel connectivity for connected component labeling.
///
/// Determines which pixels are considered neighbors when grouping
/// foreground pixels into spots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// 4-connectivity: only horizontal and vertical neighbors.
    /// Pixels at (x±1, y) and (x, y±1) are connected.
    Four,
    /// 8-connectivity: includes diagonal neighbors.
    /// This is the default for the final spot labeling.
    #[default]
    Eight,
}

/// Parameters of the segmentation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Side of the neighbourhood used for the local threshold, in pixels.
    /// Must be odd. The Gaussian sigma is `(block_size - 1) / 6`.
    pub block_size: usize,
    /// Spots with fewer pixels than this are discarded as noise.
    pub min_area: usize,
    /// Disk radius of the closing that fills gaps inside spots.
    pub closing_radius: usize,
    /// Disk radius of the opening that cuts thin bridges between spots.
    pub opening_radius: usize,
    /// Connectivity of the final spot labeling.
    pub connectivity: Connectivity,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            block_size: 201,
            min_area: 5,
            closing_radius: 3,
            opening_radius: 1,
            connectivity: Connectivity::Eight,
        }
    }
}

impl SegmentationConfig {
    /// First violated invariant, if any.
    pub fn check(&self) -> Result<(), String> {
        if self.block_size < 3 {
            return Err(format!("block_size must be at least 3, got {}", self.block_size));
        }
        if self.block_size % 2 == 0 {
            return Err(format!("block_size must be odd, got {}", self.block_size));
        }
        if self.min_area == 0 {
            return Err("min_area must be at least 1".to_string());
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Panics
    /// Panics if the block size is even or smaller than 3, or if `min_area` is 0.
    pub fn validate(&self) {
        if let Err(msg) = self.check() {
            panic!("{msg}");
        }
    }

    /// Gaussian sigma of the local threshold.
    pub fn threshold_sigma(&self) -> f64 {
        (self.block_size - 1) as f64 / 6.0
    }
}
