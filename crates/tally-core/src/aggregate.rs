//! Statistics over the union of all groups.
//!
//! Two overall means are reported side by side:
//!
//! - `pooled_mean` weights every reading equally (Σ sums / Σ counts),
//! - `mean_of_means` weights every group equally.
//!
//! They agree when all groups have the same number of readings and differ
//! otherwise. Both are intended outputs.

use serde::{Deserialize, Serialize};

use crate::dataset::GroupStatistics;
use crate::error::{TallyError, TallyResult};
use crate::stats::finite;

/// An extreme reading located by group name and position within the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeReading {
    pub group: String,
    /// Zero-based position in the group's readings.
    pub index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub group_count: usize,
    pub reading_count: usize,
    pub total: f64,
    pub pooled_mean: f64,
    pub mean_of_means: f64,
    pub min_group_mean: f64,
    pub max_group_mean: f64,
    pub max_reading: ExtremeReading,
    pub min_reading: ExtremeReading,
    pub warning_count: usize,
}

impl AggregateStatistics {
    pub fn group_mean_range(&self) -> f64 {
        self.max_group_mean - self.min_group_mean
    }

    pub fn reading_range(&self) -> f64 {
        self.max_reading.value - self.min_reading.value
    }
}

/// Combine per-group statistics. Ties on extremes keep the earliest group.
///
/// Fails with [`TallyError::Overflow`] when the combined totals leave the
/// finite range, even if every group on its own is finite.
pub fn compute_aggregate(groups: &[GroupStatistics]) -> TallyResult<AggregateStatistics> {
    let first = groups.first().ok_or(TallyError::EmptyDataset)?;

    let mut reading_count = 0;
    let mut total = 0.0;
    let mut sum_of_means = 0.0;
    let mut min_group_mean = first.summary.mean;
    let mut max_group_mean = first.summary.mean;
    let mut min_at = first;
    let mut max_at = first;
    let mut warning_count = 0;

    for g in groups {
        let s = &g.summary;
        reading_count += s.count;
        total += s.sum;
        sum_of_means += s.mean;
        min_group_mean = min_group_mean.min(s.mean);
        max_group_mean = max_group_mean.max(s.mean);
        if s.min.value < min_at.summary.min.value {
            min_at = g;
        }
        if s.max.value > max_at.summary.max.value {
            max_at = g;
        }
        if g.warning {
            warning_count += 1;
        }
    }

    if reading_count == 0 {
        return Err(TallyError::EmptyDataset);
    }
    let total = finite(total, "total")?;
    let mean_of_means = finite(sum_of_means, "sum of group means")? / groups.len() as f64;
    finite(max_group_mean - min_group_mean, "range of group means")?;
    finite(
        max_at.summary.max.value - min_at.summary.min.value,
        "range of readings",
    )?;

    let aggregate = AggregateStatistics {
        group_count: groups.len(),
        reading_count,
        total,
        pooled_mean: total / reading_count as f64,
        mean_of_means,
        min_group_mean,
        max_group_mean,
        max_reading: ExtremeReading {
            group: max_at.name.clone(),
            index: max_at.summary.max.index,
            value: max_at.summary.max.value,
        },
        min_reading: ExtremeReading {
            group: min_at.name.clone(),
            index: min_at.summary.min.index,
            value: min_at.summary.min.value,
        },
        warning_count,
    };
    tracing::debug!(
        groups = aggregate.group_count,
        readings = aggregate.reading_count,
        pooled_mean = aggregate.pooled_mean,
        mean_of_means = aggregate.mean_of_means,
        "computed aggregate statistics"
    );
    Ok(aggregate)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::dataset::{Dataset, Group};
    use crate::stats::Deviation;
    use crate::threshold::{Comparison, Metric, Threshold};
    use proptest::prelude::*;

    fn aggregate_of(groups: Vec<Vec<f64>>) -> AggregateStatistics {
        let threshold = Threshold::new(0.0, Comparison::GreaterThan, Metric::Mean).unwrap();
        let dataset = Dataset::from_groups(
            groups
                .into_iter()
                .enumerate()
                .map(|(i, r)| Group::new(format!("g{i}"), r)),
        )
        .unwrap();
        let stats = dataset.group_statistics(Deviation::Sample, &threshold).unwrap();
        compute_aggregate(&stats).unwrap()
    }

    fn equal_size_groups() -> impl Strategy<Value = Vec<Vec<f64>>> {
        (1usize..10, 1usize..8).prop_flat_map(|(size, n)| {
            proptest::collection::vec(proptest::collection::vec(-1e3f64..1e3, size), n)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn equal_sizes_make_means_agree(groups in equal_size_groups()) {
            let agg = aggregate_of(groups);
            prop_assert!((agg.pooled_mean - agg.mean_of_means).abs() < 1e-6);
        }

        #[test]
        fn pooled_mean_matches_all_readings(groups in equal_size_groups()) {
            let all: Vec<f64> = groups.iter().flatten().copied().collect();
            let expected = all.iter().sum::<f64>() / all.len() as f64;
            let agg = aggregate_of(groups);
            prop_assert!((agg.pooled_mean - expected).abs() < 1e-6);
        }

        #[test]
        fn unequal_sizes_with_distinct_means_differ(
            small in 1usize..5,
            extra in 1usize..5,
            low in -100.0f64..0.0,
            high in 1.0f64..100.0,
        ) {
            // Groups of different sizes whose means differ pull the pooled
            // mean towards the larger group.
            let agg = aggregate_of(vec![vec![low; small], vec![high; small + extra]]);
            prop_assert!(agg.pooled_mean > agg.mean_of_means);
        }
    }
}
