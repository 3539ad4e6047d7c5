//! Threshold checks used for warnings and variability classes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TallyError, TallyResult};
use crate::stats::Summary;

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    GreaterThan,
    GreaterOrEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::GreaterOrEqual => write!(f, "greater_or_equal"),
        }
    }
}

impl std::str::FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greater_than" | "gt" | ">" => Ok(Self::GreaterThan),
            "greater_or_equal" | "ge" | ">=" => Ok(Self::GreaterOrEqual),
            _ => Err(format!("invalid comparison: {s}")),
        }
    }
}

/// `stat > threshold` or `stat >= threshold`.
///
/// Both operands must be finite.
pub fn classify(stat: f64, threshold: f64, comparison: Comparison) -> TallyResult<bool> {
    if !threshold.is_finite() {
        return Err(TallyError::InvalidThreshold(format!(
            "threshold must be finite, got {threshold}"
        )));
    }
    if !stat.is_finite() {
        return Err(TallyError::InvalidThreshold(format!(
            "cannot compare non-finite statistic {stat}"
        )));
    }
    Ok(match comparison {
        Comparison::GreaterThan => stat > threshold,
        Comparison::GreaterOrEqual => stat >= threshold,
    })
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// A single number picked out of a [`Summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Range,
    StdDev,
    Sum,
    Count,
}

impl Metric {
    pub fn value(self, summary: &Summary) -> f64 {
        match self {
            Self::Mean => summary.mean,
            Self::Median => summary.median,
            Self::Min => summary.min.value,
            Self::Max => summary.max.value,
            Self::Range => summary.range(),
            Self::StdDev => summary.std_dev,
            Self::Sum => summary.sum,
            Self::Count => summary.count as f64,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Median => write!(f, "median"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Range => write!(f, "range"),
            Self::StdDev => write!(f, "std_dev"),
            Self::Sum => write!(f, "sum"),
            Self::Count => write!(f, "count"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "range" => Ok(Self::Range),
            "std_dev" | "stddev" | "sd" => Ok(Self::StdDev),
            "sum" | "total" => Ok(Self::Sum),
            "count" => Ok(Self::Count),
            _ => Err(format!("invalid metric: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Warning rule applied to every group: `metric <comparison> value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub metric: Metric,
}

impl Threshold {
    pub fn new(value: f64, comparison: Comparison, metric: Metric) -> TallyResult<Self> {
        if !value.is_finite() {
            return Err(TallyError::InvalidThreshold(format!(
                "threshold must be finite, got {value}"
            )));
        }
        Ok(Self {
            value,
            comparison,
            metric,
        })
    }

    pub fn check(&self, summary: &Summary) -> TallyResult<bool> {
        classify(self.metric.value(summary), self.value, self.comparison)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.metric,
            self.comparison.symbol(),
            self.value
        )
    }
}

// ---------------------------------------------------------------------------
// Variability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    VeryStable,
    ModeratelyStable,
    Unstable,
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryStable => write!(f, "very stable"),
            Self::ModeratelyStable => write!(f, "moderately stable"),
            Self::Unstable => write!(f, "unstable"),
        }
    }
}

/// Standard deviation cut-offs: `sd < stable_below` is very stable,
/// `sd < moderate_below` is moderately stable, anything else unstable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariabilityBands {
    pub stable_below: f64,
    pub moderate_below: f64,
}

impl Default for VariabilityBands {
    fn default() -> Self {
        Self {
            stable_below: 1.5,
            moderate_below: 3.0,
        }
    }
}

impl VariabilityBands {
    pub fn new(stable_below: f64, moderate_below: f64) -> TallyResult<Self> {
        let bands = Self {
            stable_below,
            moderate_below,
        };
        bands.validate()?;
        Ok(bands)
    }

    pub fn validate(&self) -> TallyResult<()> {
        if !self.stable_below.is_finite() || !self.moderate_below.is_finite() {
            return Err(TallyError::InvalidThreshold(
                "variability bands must be finite".into(),
            ));
        }
        if self.stable_below >= self.moderate_below {
            return Err(TallyError::InvalidThreshold(format!(
                "stable_below ({}) must be below moderate_below ({})",
                self.stable_below, self.moderate_below
            )));
        }
        Ok(())
    }
}

pub fn classify_variability(std_dev: f64, bands: &VariabilityBands) -> Stability {
    if std_dev < bands.stable_below {
        Stability::VeryStable
    } else if std_dev < bands.moderate_below {
        Stability::ModeratelyStable
    } else {
        Stability::Unstable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{compute_group_stats, Deviation};

    #[test]
    fn test_classify_boundary() {
        assert!(!classify(10.0, 10.0, Comparison::GreaterThan).unwrap());
        assert!(classify(10.0, 10.0, Comparison::GreaterOrEqual).unwrap());
        assert!(classify(10.5, 10.0, Comparison::GreaterThan).unwrap());
        assert!(!classify(9.9, 10.0, Comparison::GreaterOrEqual).unwrap());
    }

    #[test]
    fn test_classify_rejects_non_finite() {
        assert!(matches!(
            classify(1.0, f64::NAN, Comparison::GreaterThan),
            Err(TallyError::InvalidThreshold(_))
        ));
        assert!(matches!(
            classify(f64::INFINITY, 1.0, Comparison::GreaterThan),
            Err(TallyError::InvalidThreshold(_))
        ));
        assert!(Threshold::new(f64::INFINITY, Comparison::GreaterThan, Metric::Mean).is_err());
    }

    #[test]
    fn test_threshold_checks_chosen_metric() {
        let s = compute_group_stats(&[3.0, 4.0, 2.0, 5.0], Deviation::Sample).unwrap();
        let on_mean = Threshold::new(10.0, Comparison::GreaterThan, Metric::Mean).unwrap();
        let on_max = Threshold::new(5.0, Comparison::GreaterOrEqual, Metric::Max).unwrap();
        assert!(!on_mean.check(&s).unwrap());
        assert!(on_max.check(&s).unwrap());
        assert_eq!(on_max.to_string(), "max >= 5");
    }

    #[test]
    fn test_variability_bands() {
        let bands = VariabilityBands::default();
        assert_eq!(classify_variability(1.2, &bands), Stability::VeryStable);
        assert_eq!(classify_variability(1.5, &bands), Stability::ModeratelyStable);
        assert_eq!(classify_variability(3.0, &bands), Stability::Unstable);
        assert!(VariabilityBands::new(3.0, 1.5).is_err());
        assert!(VariabilityBands::new(f64::NAN, 1.5).is_err());
    }

    #[test]
    fn test_parse_metric_and_comparison() {
        assert_eq!("sd".parse::<Metric>().unwrap(), Metric::StdDev);
        assert_eq!(">=".parse::<Comparison>().unwrap(), Comparison::GreaterOrEqual);
        assert!("mode".parse::<Metric>().is_err());
    }

    #[test]
    fn test_threshold_from_toml_defaults() {
        let t: Threshold = toml::from_str("value = 10.0").unwrap();
        assert_eq!(t.comparison, Comparison::GreaterThan);
        assert_eq!(t.metric, Metric::Mean);
    }
}
