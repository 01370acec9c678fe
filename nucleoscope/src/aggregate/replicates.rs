//! Seedling-level replicate statistics.
//!
//! Images of the same seedling are technical replicates. They are averaged
//! into one value per seedling first; condition statistics are then computed
//! across seedlings, never across raw images.

use std::collections::BTreeMap;

use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter};

use super::SummaryRecord;
use crate::metadata::{Genotype, Region};

/// Which images take part in a replicate analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ReplicateSet {
    /// Individual optical sections (z-slice index present).
    ZSlices,
    /// Stitched or projected stacks (no z-slice index).
    Stacks,
}

impl ReplicateSet {
    pub fn contains(&self, record: &SummaryRecord) -> bool {
        match self {
            ReplicateSet::ZSlices => record.zslice.is_some(),
            ReplicateSet::Stacks => record.zslice.is_none(),
        }
    }
}

/// Mean of one seedling's images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedlingMean {
    pub region: Region,
    pub genotype: Genotype,
    pub seedling: u32,
    pub images: usize,
    pub integrated_intensity: f64,
    pub total_area: f64,
}

/// Statistics of one (region, genotype) condition across seedlings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionStats {
    pub region: Region,
    pub genotype: Genotype,
    pub seedlings: usize,
    pub integrated_intensity_mean: f64,
    /// Standard error of the seedling means; `None` with fewer than two seedlings.
    pub integrated_intensity_sem: Option<f64>,
    pub total_area_mean: f64,
    pub total_area_sem: Option<f64>,
}

/// Sample mean and standard error of the mean (ddof = 1).
///
/// Returns `(NaN, None)` for an empty slice and `(x, None)` for one value.
pub fn mean_and_sem(values: &[f64]) -> (f64, Option<f64>) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, None);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, None);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, Some(variance.sqrt() / (n as f64).sqrt()))
}

/// Stage one: average each seedling's images within `set`.
///
/// Records without a seedling number cannot be attributed to a replicate and
/// are skipped. Output is sorted by (region, genotype, seedling).
pub fn seedling_means(records: &[SummaryRecord], set: ReplicateSet) -> Vec<SeedlingMean> {
    let mut groups: BTreeMap<(Region, Genotype, u32), Vec<&SummaryRecord>> = BTreeMap::new();
    let mut skipped = 0usize;

    for record in records.iter().filter(|r| set.contains(r)) {
        match record.seedling {
            Some(seedling) => groups
                .entry((record.region, record.genotype, seedling))
                .or_default()
                .push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("{set}: skipped {skipped} records without a seedling number");
    }

    groups
        .into_iter()
        .map(|((region, genotype, seedling), group)| {
            let n = group.len() as f64;
            SeedlingMean {
                region,
                genotype,
                seedling,
                images: group.len(),
                integrated_intensity: group.iter().map(|r| r.integrated_intensity).sum::<f64>() / n,
                total_area: group.iter().map(|r| r.total_area as f64).sum::<f64>() / n,
            }
        })
        .collect()
}

/// Stage two: mean and standard error across seedlings per (region, genotype).
pub fn condition_stats(seedlings: &[SeedlingMean]) -> Vec<ConditionStats> {
    let mut groups: BTreeMap<(Region, Genotype), Vec<&SeedlingMean>> = BTreeMap::new();
    for seedling in seedlings {
        groups
            .entry((seedling.region, seedling.genotype))
            .or_default()
            .push(seedling);
    }

    groups
        .into_iter()
        .map(|((region, genotype), group)| {
            let intensities: Vec<f64> = group.iter().map(|s| s.integrated_intensity).collect();
            let areas: Vec<f64> = group.iter().map(|s| s.total_area).collect();
            let (integrated_intensity_mean, integrated_intensity_sem) = mean_and_sem(&intensities);
            let (total_area_mean, total_area_sem) = mean_and_sem(&areas);

            ConditionStats {
                region,
                genotype,
                seedlings: group.len(),
                integrated_intensity_mean,
                integrated_intensity_sem,
                total_area_mean,
                total_area_sem,
            }
        })
        .collect()
}

/// Both stages in one call.
pub fn aggregate_conditions(records: &[SummaryRecord], set: ReplicateSet) -> Vec<ConditionStats> {
    condition_stats(&seedling_means(records, set))
}
