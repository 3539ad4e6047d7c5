//! Descriptive statistics over a single sequence of readings.
//!
//! Every function fails fast with [`TallyError::EmptyDataset`] on empty
//! input instead of returning NaN.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TallyError, TallyResult};

// ---------------------------------------------------------------------------
// Deviation
// ---------------------------------------------------------------------------

/// Divisor used for the standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    /// Divide by `n - 1`. The readings are a sample of a larger population.
    #[default]
    Sample,
    /// Divide by `n`. The readings are the whole population.
    Population,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample => write!(f, "sample"),
            Self::Population => write!(f, "population"),
        }
    }
}

impl std::str::FromStr for Deviation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sample" => Ok(Self::Sample),
            "population" | "pop" => Ok(Self::Population),
            _ => Err(format!("invalid deviation: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

pub fn sum(values: &[f64]) -> TallyResult<f64> {
    if values.is_empty() {
        return Err(TallyError::EmptyDataset);
    }
    finite(values.iter().sum(), "sum")
}

pub fn mean(values: &[f64]) -> TallyResult<f64> {
    Ok(sum(values)? / values.len() as f64)
}

/// Median of a sorted copy. Even lengths average the two central values.
pub fn median(values: &[f64]) -> TallyResult<f64> {
    if values.is_empty() {
        return Err(TallyError::EmptyDataset);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        // Halve first so two huge readings cannot overflow.
        Ok(sorted[mid - 1] / 2.0 + sorted[mid] / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Standard deviation with the given divisor.
///
/// The sample form needs at least two readings and returns
/// [`TallyError::InsufficientData`] otherwise. [`compute_group_stats`]
/// maps that case to `0.0`.
pub fn std_dev(values: &[f64], deviation: Deviation) -> TallyResult<f64> {
    let m = mean(values)?;
    let n = values.len();
    let divisor = match deviation {
        Deviation::Sample if n < 2 => {
            return Err(TallyError::InsufficientData { needed: 2, got: n });
        }
        Deviation::Sample => (n - 1) as f64,
        Deviation::Population => n as f64,
    };
    let squared: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    finite((squared / divisor).sqrt(), "standard deviation")
}

/// Reject a computed statistic that left the finite range.
pub(crate) fn finite(value: f64, what: &'static str) -> TallyResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TallyError::Overflow(what))
    }
}

/// Position and value of an extreme reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub index: usize,
    pub value: f64,
}

/// Minimum and maximum by linear scan. Ties keep the first occurrence.
pub fn min_max(values: &[f64]) -> TallyResult<(Extreme, Extreme)> {
    let (&first, rest) = values.split_first().ok_or(TallyError::EmptyDataset)?;
    let mut min = Extreme { index: 0, value: first };
    let mut max = min;
    for (offset, &v) in rest.iter().enumerate() {
        if v < min.value {
            min = Extreme { index: offset + 1, value: v };
        }
        if v > max.value {
            max = Extreme { index: offset + 1, value: v };
        }
    }
    Ok((min, max))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Descriptive statistics of one sequence. Read-only once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub deviation: Deviation,
    pub min: Extreme,
    pub max: Extreme,
}

impl Summary {
    pub fn range(&self) -> f64 {
        self.max.value - self.min.value
    }
}

/// Compute every statistic of `readings` in one pass over the helpers.
///
/// A single reading has a sample standard deviation of `0.0` by
/// convention. Any statistic that overflows is reported as
/// [`TallyError::Overflow`].
pub fn compute_group_stats(readings: &[f64], deviation: Deviation) -> TallyResult<Summary> {
    let total = sum(readings)?;
    let count = readings.len();
    let std_dev = match std_dev(readings, deviation) {
        Ok(sd) => sd,
        Err(TallyError::InsufficientData { .. }) => 0.0,
        Err(e) => return Err(e),
    };
    let (min, max) = min_max(readings)?;
    finite(max.value - min.value, "range")?;
    Ok(Summary {
        count,
        sum: total,
        mean: total / count as f64,
        median: median(readings)?,
        std_dev,
        deviation,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[10.0, 20.0, 30.0, 40.0]).unwrap(), 25.0);
        assert_eq!(median(&[10.0, 20.0, 30.0]).unwrap(), 20.0);
        assert_eq!(median(&[30.0, 10.0, 20.0]).unwrap(), 20.0);
    }

    #[test]
    fn test_median_does_not_reorder_input() {
        let values = vec![3.0, 1.0, 2.0];
        median(&values).unwrap();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_std_dev_sample_and_population() {
        let temps = [22.5, 23.1, 24.0, 23.2];
        let sample = std_dev(&temps, Deviation::Sample).unwrap();
        let population = std_dev(&temps, Deviation::Population).unwrap();
        assert!((sample - 0.6164).abs() < 1e-3, "got {sample}");
        assert!((population - 0.5339).abs() < 1e-3, "got {population}");
    }

    #[test]
    fn test_sample_std_dev_needs_two_readings() {
        let err = std_dev(&[5.0], Deviation::Sample).unwrap_err();
        assert!(matches!(err, TallyError::InsufficientData { needed: 2, got: 1 }));
        assert_eq!(std_dev(&[5.0], Deviation::Population).unwrap(), 0.0);
    }

    #[test]
    fn test_singleton_group_has_zero_sample_deviation() {
        let s = compute_group_stats(&[7.5], Deviation::Sample).unwrap();
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.mean, 7.5);
        assert_eq!(s.median, 7.5);
        assert_eq!(s.range(), 0.0);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(sum(&[]), Err(TallyError::EmptyDataset)));
        assert!(matches!(mean(&[]), Err(TallyError::EmptyDataset)));
        assert!(matches!(median(&[]), Err(TallyError::EmptyDataset)));
        assert!(matches!(
            std_dev(&[], Deviation::Population),
            Err(TallyError::EmptyDataset)
        ));
        assert!(matches!(min_max(&[]), Err(TallyError::EmptyDataset)));
        assert!(matches!(
            compute_group_stats(&[], Deviation::Sample),
            Err(TallyError::EmptyDataset)
        ));
    }

    #[test]
    fn test_min_max_ties_keep_first_occurrence() {
        let (min, max) = min_max(&[4.0, 1.0, 9.0, 1.0, 9.0]).unwrap();
        assert_eq!(min, Extreme { index: 1, value: 1.0 });
        assert_eq!(max, Extreme { index: 2, value: 9.0 });
    }

    #[test]
    fn test_rainfall_summary() {
        let s = compute_group_stats(&[12.0, 15.0, 9.0, 14.0], Deviation::Population).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.sum, 50.0);
        assert!((s.mean - 12.5).abs() < EPS);
        assert!((s.median - 13.0).abs() < EPS);
        assert_eq!(s.min.value, 9.0);
        assert_eq!(s.max.value, 15.0);
        assert_eq!(s.range(), 6.0);
        assert_eq!(s.deviation, Deviation::Population);
    }

    #[test]
    fn test_overflowing_readings_are_an_error() {
        let huge = [f64::MAX, f64::MAX];
        assert!(matches!(sum(&huge), Err(TallyError::Overflow("sum"))));
        assert!(matches!(mean(&huge), Err(TallyError::Overflow(_))));
        assert!(matches!(
            compute_group_stats(&huge, Deviation::Sample),
            Err(TallyError::Overflow(_))
        ));
        // Median of two huge readings stays finite.
        assert_eq!(median(&huge).unwrap(), f64::MAX);
    }

    #[test]
    fn test_overflowing_deviation_and_range() {
        let spread = [1e200, -1e200, 1e200];
        assert!(matches!(
            std_dev(&spread, Deviation::Population),
            Err(TallyError::Overflow("standard deviation"))
        ));
        let wide = [f64::MAX, -f64::MAX, 0.0];
        assert!(matches!(
            compute_group_stats(&wide, Deviation::Population),
            Err(TallyError::Overflow(_))
        ));
    }

    #[test]
    fn test_deviation_from_str() {
        assert_eq!("Sample".parse::<Deviation>().unwrap(), Deviation::Sample);
        assert_eq!("pop".parse::<Deviation>().unwrap(), Deviation::Population);
        assert!("median".parse::<Deviation>().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1e6f64..1e6, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn mean_is_sum_over_len(data in finite_vec(1, 100)) {
            let m = mean(&data).unwrap();
            let expected = sum(&data).unwrap() / data.len() as f64;
            prop_assert!((m - expected).abs() < 1e-9);
        }

        #[test]
        fn mean_and_median_lie_between_extremes(data in finite_vec(1, 100)) {
            let s = compute_group_stats(&data, Deviation::Sample).unwrap();
            let tol = 1e-6;
            prop_assert!(s.min.value <= s.mean + tol && s.mean <= s.max.value + tol);
            prop_assert!(s.min.value <= s.median && s.median <= s.max.value);
        }

        #[test]
        fn std_dev_is_non_negative(data in finite_vec(2, 100)) {
            prop_assert!(std_dev(&data, Deviation::Sample).unwrap() >= 0.0);
            prop_assert!(std_dev(&data, Deviation::Population).unwrap() >= 0.0);
        }

        #[test]
        fn population_never_exceeds_sample(data in finite_vec(2, 100)) {
            let sample = std_dev(&data, Deviation::Sample).unwrap();
            let population = std_dev(&data, Deviation::Population).unwrap();
            prop_assert!(population <= sample + 1e-9);
        }
    }
}
