use serde::{Deserialize, Serialize};

use crate::error::{TallyError, TallyResult};
use crate::stats::{compute_group_stats, Deviation, Summary};
use crate::threshold::Threshold;

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// One named partition of a dataset, e.g. a weather station or a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Category the group belongs to, e.g. a region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub readings: Vec<f64>,
}

impl Group {
    pub fn new(name: impl Into<String>, readings: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            label: None,
            readings,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn validate(&self) -> TallyResult<()> {
        if self.readings.is_empty() {
            return Err(TallyError::EmptyGroup(self.name.clone()));
        }
        if let Some(index) = self.readings.iter().position(|v| !v.is_finite()) {
            return Err(TallyError::NonFiniteReading {
                group: self.name.clone(),
                index,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Ordered, validated collection of groups.
///
/// Every group has at least one finite reading and names are unique, so
/// statistics over a `Dataset` never see empty input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct RawDataset {
    #[serde(default)]
    groups: Vec<Group>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = TallyError;

    fn try_from(raw: RawDataset) -> TallyResult<Self> {
        Self::from_groups(raw.groups)
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unnamed series, reported as one group called `name`.
    pub fn flat(name: impl Into<String>, readings: Vec<f64>) -> TallyResult<Self> {
        let mut dataset = Self::new();
        dataset.push(Group::new(name, readings))?;
        Ok(dataset)
    }

    pub fn from_groups(groups: impl IntoIterator<Item = Group>) -> TallyResult<Self> {
        let mut dataset = Self::new();
        for group in groups {
            dataset.push(group)?;
        }
        Ok(dataset)
    }

    pub fn push(&mut self, group: Group) -> TallyResult<()> {
        group.validate()?;
        if self.groups.iter().any(|g| g.name == group.name) {
            return Err(TallyError::DuplicateGroup(group.name));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Every reading of every group, in dataset order.
    pub fn pooled(&self) -> Vec<f64> {
        self.groups
            .iter()
            .flat_map(|g| g.readings.iter().copied())
            .collect()
    }

    /// Per-group statistics in dataset order.
    pub fn group_statistics(
        &self,
        deviation: Deviation,
        threshold: &Threshold,
    ) -> TallyResult<Vec<GroupStatistics>> {
        if self.groups.is_empty() {
            return Err(TallyError::EmptyDataset);
        }
        self.groups
            .iter()
            .map(|g| GroupStatistics::compute(g, deviation, threshold))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GroupStatistics
// ---------------------------------------------------------------------------

/// Statistics of one group together with its warning flag.
///
/// Serializes every column an export needs: name, label, count, mean,
/// median, min, max, std dev and warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub summary: Summary,
    pub warning: bool,
}

impl GroupStatistics {
    pub fn compute(
        group: &Group,
        deviation: Deviation,
        threshold: &Threshold,
    ) -> TallyResult<Self> {
        let summary = compute_group_stats(&group.readings, deviation)?;
        let warning = threshold.check(&summary)?;
        tracing::debug!(
            group = %group.name,
            count = summary.count,
            mean = summary.mean,
            warning,
            "computed group statistics"
        );
        Ok(Self {
            name: group.name.clone(),
            label: group.label.clone(),
            summary,
            warning,
        })
    }
}
