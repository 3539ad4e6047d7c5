use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::dataset::GroupStatistics;
use crate::threshold::Metric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

impl std::str::FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            _ => Err(format!("invalid order: {s}")),
        }
    }
}

/// Groups sorted by `metric`, ties broken by name ascending.
pub fn ranked<'a>(
    groups: &'a [GroupStatistics],
    metric: Metric,
    order: Order,
) -> Vec<&'a GroupStatistics> {
    let mut sorted: Vec<&GroupStatistics> = groups.iter().collect();
    sorted.sort_by(|a, b| {
        let by_metric = metric.value(&a.summary).total_cmp(&metric.value(&b.summary));
        let by_metric = match order {
            Order::Ascending => by_metric,
            Order::Descending => by_metric.reverse(),
        };
        by_metric.then_with(|| a.name.cmp(&b.name))
    });
    sorted
}

/// Group names ordered by `metric`, truncated to `limit` when given.
pub fn rank_groups(
    groups: &[GroupStatistics],
    metric: Metric,
    order: Order,
    limit: Option<usize>,
) -> Vec<String> {
    let limit = limit.unwrap_or(groups.len());
    ranked(groups, metric, order)
        .into_iter()
        .take(limit)
        .map(|g| g.name.clone())
        .collect()
}

/// Name order, used wherever a report lists groups without ranking them.
pub(crate) fn by_name(a: &&GroupStatistics, b: &&GroupStatistics) -> Ordering {
    a.name.cmp(&b.name)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::dataset::{Dataset, Group};
    use crate::stats::Deviation;
    use crate::threshold::{Comparison, Threshold};
    use proptest::prelude::*;

    // Small integer readings so that means collide often.
    fn groups() -> impl Strategy<Value = Vec<GroupStatistics>> {
        proptest::collection::btree_set("[a-z]{1,6}", 1..15).prop_flat_map(|names| {
            let n = names.len();
            (
                Just(names),
                proptest::collection::vec(proptest::collection::vec(0u8..4, 1..4), n),
            )
                .prop_map(|(names, readings)| {
                    let threshold =
                        Threshold::new(1.0, Comparison::GreaterThan, Metric::Mean).unwrap();
                    Dataset::from_groups(names.into_iter().zip(readings).map(|(name, r)| {
                        Group::new(name, r.into_iter().map(f64::from).collect())
                    }))
                    .unwrap()
                    .group_statistics(Deviation::Sample, &threshold)
                    .unwrap()
                })
        })
    }

    fn metric() -> impl Strategy<Value = Metric> {
        prop_oneof![
            Just(Metric::Mean),
            Just(Metric::Median),
            Just(Metric::Max),
            Just(Metric::Count),
            Just(Metric::StdDev),
        ]
    }

    fn order() -> impl Strategy<Value = Order> {
        prop_oneof![Just(Order::Ascending), Just(Order::Descending)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn ranking_is_a_permutation(stats in groups(), metric in metric(), order in order()) {
            let mut names = rank_groups(&stats, metric, order, None);
            names.sort();
            let mut input: Vec<String> = stats.iter().map(|g| g.name.clone()).collect();
            input.sort();
            prop_assert_eq!(names, input);
        }

        #[test]
        fn ranking_is_deterministic(stats in groups(), metric in metric(), order in order()) {
            let first = rank_groups(&stats, metric, order, None);
            let mut reversed = stats.clone();
            reversed.reverse();
            prop_assert_eq!(&first, &rank_groups(&stats, metric, order, None));
            prop_assert_eq!(&first, &rank_groups(&reversed, metric, order, None));
        }

        #[test]
        fn adjacent_pairs_follow_metric_then_name(
            stats in groups(),
            metric in metric(),
            order in order(),
        ) {
            let sorted = ranked(&stats, metric, order);
            for pair in sorted.windows(2) {
                let (a, b) = (metric.value(&pair[0].summary), metric.value(&pair[1].summary));
                let by_metric = match order {
                    Order::Ascending => a.total_cmp(&b),
                    Order::Descending => b.total_cmp(&a),
                };
                prop_assert_ne!(by_metric, Ordering::Greater);
                if by_metric == Ordering::Equal {
                    prop_assert!(pair[0].name < pair[1].name);
                }
            }
        }

        #[test]
        fn limit_takes_a_prefix(stats in groups(), limit in 0usize..20) {
            let all = rank_groups(&stats, Metric::Mean, Order::Descending, None);
            let top = rank_groups(&stats, Metric::Mean, Order::Descending, Some(limit));
            prop_assert_eq!(top.len(), limit.min(all.len()));
            prop_assert_eq!(&all[..top.len()], &top[..]);
        }
    }
}
