//! Per-spot region properties.

use serde::{Deserialize, Serialize};

use super::labeling::LabelMap;
use crate::normalize::NormalizedImage;

/// Measurements of one labeled spot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotMeasurement {
    /// Component label, 1-based.
    pub label: u32,
    /// Pixel count.
    pub area_pixels: u32,
    /// Mean normalized intensity over the spot's pixels.
    pub mean_intensity: f64,
    /// `mean_intensity * area_pixels`, i.e. the summed intensity.
    pub integrated_intensity: f64,
}

impl SpotMeasurement {
    pub fn new(label: u32, area_pixels: u32, intensity_sum: u64) -> Self {
        let mean_intensity = if area_pixels > 0 {
            intensity_sum as f64 / area_pixels as f64
        } else {
            0.0
        };
        Self {
            label,
            area_pixels,
            mean_intensity,
            integrated_intensity: mean_intensity * area_pixels as f64,
        }
    }
}

/// Measure every labeled region over `intensity`, ordered by label.
pub fn measure_regions(labels: &LabelMap, intensity: &NormalizedImage) -> Vec<SpotMeasurement> {
    debug_assert_eq!(labels.width(), intensity.width());
    debug_assert_eq!(labels.height(), intensity.height());

    let n = labels.num_labels();
    let mut areas = vec![0u32; n + 1];
    let mut sums = vec![0u64; n + 1];

    for (&label, &value) in labels.labels().iter().zip(intensity.iter()) {
        if label != 0 {
            areas[label as usize] += 1;
            sums[label as usize] += value as u64;
        }
    }

    (1..=n)
        .map(|label| SpotMeasurement::new(label as u32, areas[label], sums[label]))
        .collect()
}
