//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config <path>` on the command line
//! 2. `$TALLY_CONFIG` environment variable
//! 3. `<platform config dir>/tally/config.toml`
//! 4. Built-in defaults (everything is optional)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use tally_core::{Comparison, Deviation, Metric, Threshold, VariabilityBands};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub report: ReportConfig,
    pub threshold: ThresholdConfig,
    pub variability: VariabilityBands,
}

/// Report layout settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub title: String,
    /// Unit shown next to values, e.g. "mm".
    pub unit: Option<String>,
    /// Decimal places (2-4).
    pub precision: usize,
    pub rank_metric: Metric,
    pub rank_limit: usize,
    pub deviation: Deviation,
}

/// Warning rule applied to every group.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub value: f64,
    pub comparison: Comparison,
    pub metric: Metric,
}

// --- Defaults ---

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "STATISTICAL REPORT".into(),
            unit: None,
            precision: 2,
            rank_metric: Metric::Mean,
            rank_limit: 5,
            deviation: Deviation::Sample,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            value: 10.0,
            comparison: Comparison::GreaterThan,
            metric: Metric::Mean,
        }
    }
}

impl ThresholdConfig {
    pub fn to_threshold(&self) -> Result<Threshold> {
        Threshold::new(self.value, self.comparison, self.metric).context("invalid [threshold]")
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = explicit.map(Path::to_path_buf).or_else(config_path);

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            tracing::debug!(path = %p.display(), "loaded config");
            return Ok(config);
        }
        if explicit.is_some() {
            anyhow::bail!("config file not found: {}", p.display());
        }
    }

    Ok(Config::default())
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(p) = std::env::var("TALLY_CONFIG") {
        return Some(PathBuf::from(p));
    }

    // 2. Platform config dir
    directories::ProjectDirs::from("dev", "tally", "tally")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Show the active config path (for `tally config`).
pub fn show_config_path(explicit: Option<&Path>) -> String {
    match explicit.map(Path::to_path_buf).or_else(config_path) {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.report.precision, 2);
        assert_eq!(config.threshold.value, 10.0);
        assert_eq!(config.variability.stable_below, 1.5);
        assert_eq!(config.report.deviation, Deviation::Sample);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[threshold]
value = 30.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.threshold.value, 30.0);
        // Other fields should be defaults
        assert_eq!(config.threshold.comparison, Comparison::GreaterThan);
        assert_eq!(config.report.rank_limit, 5);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[report]
title = "OYO STATE WEATHER ANALYSIS"
unit = "°C"
precision = 4
rank_metric = "max"
rank_limit = 3
deviation = "population"

[threshold]
value = 35.0
comparison = "greater_or_equal"
metric = "max"

[variability]
stable_below = 0.5
moderate_below = 1.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.report.unit.as_deref(), Some("°C"));
        assert_eq!(config.report.precision, 4);
        assert_eq!(config.report.rank_metric, Metric::Max);
        assert_eq!(config.report.deviation, Deviation::Population);
        let threshold = config.threshold.to_threshold().unwrap();
        assert_eq!(threshold.comparison, Comparison::GreaterOrEqual);
        assert_eq!(config.variability.moderate_below, 1.0);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[report]\nprecision = 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.report.precision, 3);

        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
