//! Fixed-layout text reports built from computed statistics.
//!
//! A [`Report`] is assembled once from [`GroupStatistics`] and
//! [`AggregateStatistics`] and is never mutated afterwards. Rendering is
//! deterministic: the same input always yields byte-identical text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::aggregate::AggregateStatistics;
use crate::dataset::GroupStatistics;
use crate::error::{TallyError, TallyResult};
use crate::rank::{by_name, ranked, Order};
use crate::threshold::{classify_variability, Metric, Threshold, VariabilityBands};

pub const MIN_PRECISION: usize = 2;
pub const MAX_PRECISION: usize = 4;

const RULE_WIDTH: usize = 72;
const UNLABELED: &str = "(unlabeled)";

/// Reject a decimal precision outside `MIN_PRECISION..=MAX_PRECISION`.
pub fn validate_precision(precision: usize) -> TallyResult<()> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        Ok(())
    } else {
        Err(TallyError::InvalidOption(format!(
            "precision must be between {MIN_PRECISION} and {MAX_PRECISION}, got {precision}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub title: String,
    /// Unit appended to headline values, e.g. "mm" or "°C".
    pub unit: Option<String>,
    /// Decimal places, between 2 and 4.
    pub precision: usize,
    pub rank_metric: Metric,
    /// Entries in each of the top and bottom rankings.
    pub rank_limit: usize,
    pub bands: VariabilityBands,
    /// Rule the warning flags were computed with, shown in the header.
    pub threshold: Option<Threshold>,
    /// Preformatted timestamp, shown in the header when present.
    pub generated_at: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "STATISTICAL REPORT".into(),
            unit: None,
            precision: MIN_PRECISION,
            rank_metric: Metric::Mean,
            rank_limit: 5,
            bands: VariabilityBands::default(),
            threshold: None,
            generated_at: None,
        }
    }
}

impl ReportOptions {
    pub fn validate(&self) -> TallyResult<()> {
        validate_precision(self.precision)?;
        if self.rank_limit == 0 {
            return Err(TallyError::InvalidOption(
                "rank_limit must be at least 1".into(),
            ));
        }
        self.bands.validate()
    }

    fn num(&self, value: f64) -> String {
        format!("{:.*}", self.precision, value)
    }

    fn with_unit(&self, value: f64) -> String {
        match &self.unit {
            Some(unit) => format!("{} {unit}", self.num(value)),
            None => self.num(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    GroupTable,
    Warnings,
    Aggregate,
    Rankings,
    Variability,
    Categories,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub header: Vec<String>,
    pub sections: Vec<Section>,
}

impl Report {
    /// Build every section in its fixed order. The category breakdown is
    /// only included when at least one group carries a label.
    pub fn build(
        groups: &[GroupStatistics],
        aggregate: &AggregateStatistics,
        options: &ReportOptions,
    ) -> TallyResult<Self> {
        options.validate()?;
        if groups.is_empty() {
            return Err(TallyError::EmptyDataset);
        }

        let name_width = groups
            .iter()
            .map(|g| g.name.chars().count())
            .max()
            .unwrap_or(0)
            .max("GROUP".len());
        let ctx = Ctx {
            groups,
            aggregate,
            options,
            name_width,
        };

        let mut sections = vec![
            ctx.group_table(),
            ctx.warnings(),
            ctx.aggregate(),
            ctx.rankings(),
            ctx.variability(),
        ];
        if groups.iter().any(|g| g.label.is_some()) {
            sections.push(ctx.categories());
        }

        Ok(Self {
            title: options.title.clone(),
            header: ctx.header(),
            sections,
        })
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{}", self.title);
        for line in &self.header {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "{rule}");
        for section in &self.sections {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", section.title);
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
            for line in &section.lines {
                let _ = writeln!(out, "{line}");
            }
        }
        out
    }
}

/// Build and render in one step.
pub fn render_report(
    groups: &[GroupStatistics],
    aggregate: &AggregateStatistics,
    options: &ReportOptions,
) -> TallyResult<String> {
    Ok(Report::build(groups, aggregate, options)?.render())
}

// ---------------------------------------------------------------------------
// Section builders
// ---------------------------------------------------------------------------

struct Ctx<'a> {
    groups: &'a [GroupStatistics],
    aggregate: &'a AggregateStatistics,
    options: &'a ReportOptions,
    name_width: usize,
}

impl Ctx<'_> {
    fn sorted_by_name(&self) -> Vec<&GroupStatistics> {
        let mut sorted: Vec<&GroupStatistics> = self.groups.iter().collect();
        sorted.sort_by(by_name);
        sorted
    }

    fn header(&self) -> Vec<String> {
        let o = self.options;
        let mut lines = Vec::new();
        if let Some(ts) = &o.generated_at {
            lines.push(format!("Generated: {ts}"));
        }
        if let Some(t) = &o.threshold {
            let value = match &o.unit {
                Some(unit) => format!("{} {unit}", t.value),
                None => t.value.to_string(),
            };
            lines.push(format!(
                "Warning threshold: {} {} {value}",
                t.metric,
                t.comparison.symbol()
            ));
        }
        lines.push(format!(
            "Groups: {} | Readings: {}",
            self.aggregate.group_count, self.aggregate.reading_count
        ));
        lines
    }

    fn group_table(&self) -> Section {
        let o = self.options;
        let w = self.name_width;
        let has_labels = self.groups.iter().any(|g| g.label.is_some());
        let label_width = self
            .groups
            .iter()
            .filter_map(|g| g.label.as_ref().map(|l| l.chars().count()))
            .max()
            .unwrap_or(0)
            .max("LABEL".len());

        let mut lines = Vec::with_capacity(self.groups.len() + 1);
        let mut head = format!("{:<w$}", "GROUP");
        if has_labels {
            let _ = write!(head, "  {:<label_width$}", "LABEL");
        }
        let _ = write!(
            head,
            "  {:>5}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  STATUS",
            "N", "MEAN", "MEDIAN", "MIN", "MAX", "STD DEV"
        );
        lines.push(head);

        for g in self.sorted_by_name() {
            let s = &g.summary;
            let mut row = format!("{:<w$}", g.name);
            if has_labels {
                let _ = write!(
                    row,
                    "  {:<label_width$}",
                    g.label.as_deref().unwrap_or("-")
                );
            }
            let _ = write!(
                row,
                "  {:>5}  {:>12}  {:>12}  {:>12}  {:>12}  {:>12}  {}",
                s.count,
                o.num(s.mean),
                o.num(s.median),
                o.num(s.min.value),
                o.num(s.max.value),
                o.num(s.std_dev),
                if g.warning { "WARNING" } else { "OK" }
            );
            lines.push(row);
        }

        Section {
            kind: SectionKind::GroupTable,
            title: "PER-GROUP STATISTICS".into(),
            lines,
        }
    }

    fn warnings(&self) -> Section {
        let flagged: Vec<&GroupStatistics> = self
            .sorted_by_name()
            .into_iter()
            .filter(|g| g.warning)
            .collect();

        let threshold = self.options.threshold;
        let rule = threshold
            .map(|t| format!(" ({} {} {})", t.metric, t.comparison.symbol(), t.value))
            .unwrap_or_default();

        let mut lines = Vec::new();
        if flagged.is_empty() {
            lines.push(format!("No groups require a warning{rule}."));
        } else {
            lines.push(format!(
                "{} of {} groups require a warning{rule}:",
                flagged.len(),
                self.groups.len()
            ));
            for g in flagged {
                // Without the rule the flagging metric is unknown, so only
                // the name is listed.
                let line = match threshold {
                    Some(t) => format!(
                        "  - {:<w$}  {} {}",
                        g.name,
                        t.metric,
                        self.options.with_unit(t.metric.value(&g.summary)),
                        w = self.name_width
                    ),
                    None => format!("  - {}", g.name),
                };
                lines.push(line);
            }
        }

        Section {
            kind: SectionKind::Warnings,
            title: "WARNINGS".into(),
            lines,
        }
    }

    fn aggregate(&self) -> Section {
        let o = self.options;
        let a = self.aggregate;
        let mut lines = vec![
            format!("Total of all readings:        {}", o.with_unit(a.total)),
            format!("Pooled mean (all readings):   {}", o.with_unit(a.pooled_mean)),
            format!("Mean of group means:          {}", o.with_unit(a.mean_of_means)),
        ];
        let first_count = self.groups[0].summary.count;
        if self.groups.iter().any(|g| g.summary.count != first_count) {
            lines.push(
                "  (group sizes differ, so the pooled mean and the mean of group means differ)"
                    .into(),
            );
        }
        lines.extend([
            format!("Highest group mean:           {}", o.with_unit(a.max_group_mean)),
            format!("Lowest group mean:            {}", o.with_unit(a.min_group_mean)),
            format!("Range of group means:         {}", o.with_unit(a.group_mean_range())),
            format!(
                "Maximum reading:              {} ({}, reading {})",
                o.with_unit(a.max_reading.value),
                a.max_reading.group,
                a.max_reading.index + 1
            ),
            format!(
                "Minimum reading:              {} ({}, reading {})",
                o.with_unit(a.min_reading.value),
                a.min_reading.group,
                a.min_reading.index + 1
            ),
            format!("Range of readings:            {}", o.with_unit(a.reading_range())),
            format!("Groups with warnings:         {}", a.warning_count),
        ]);

        Section {
            kind: SectionKind::Aggregate,
            title: "AGGREGATE SUMMARY".into(),
            lines,
        }
    }

    fn rankings(&self) -> Section {
        let o = self.options;
        let n = o.rank_limit.min(self.groups.len());
        let mut lines = Vec::new();

        for (heading, order) in [("Top", Order::Descending), ("Bottom", Order::Ascending)] {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("{heading} {n} by {}:", o.rank_metric));
            for (i, g) in ranked(self.groups, o.rank_metric, order)
                .into_iter()
                .take(n)
                .enumerate()
            {
                lines.push(format!(
                    "  {:>2}. {:<w$}  {}  (range {} to {})",
                    i + 1,
                    g.name,
                    o.with_unit(o.rank_metric.value(&g.summary)),
                    o.num(g.summary.min.value),
                    o.num(g.summary.max.value),
                    w = self.name_width
                ));
            }
        }

        Section {
            kind: SectionKind::Rankings,
            title: "RANKINGS".into(),
            lines,
        }
    }

    fn variability(&self) -> Section {
        let o = self.options;
        let w = self.name_width;
        let mut lines = vec![format!(
            "{:<w$}  {:>12}  {:>12}  STABILITY",
            "GROUP", "MEAN", "STD DEV"
        )];
        for g in ranked(self.groups, Metric::StdDev, Order::Ascending) {
            lines.push(format!(
                "{:<w$}  {:>12}  {:>12}  {}",
                g.name,
                o.num(g.summary.mean),
                o.num(g.summary.std_dev),
                classify_variability(g.summary.std_dev, &o.bands)
            ));
        }
        lines.push(format!(
            "(very stable: std dev < {}, moderately stable: < {}, otherwise unstable)",
            o.bands.stable_below, o.bands.moderate_below
        ));

        Section {
            kind: SectionKind::Variability,
            title: "VARIABILITY".into(),
            lines,
        }
    }

    fn categories(&self) -> Section {
        let o = self.options;
        let mut by_label: BTreeMap<&str, Vec<&GroupStatistics>> = BTreeMap::new();
        for g in self.sorted_by_name() {
            by_label
                .entry(g.label.as_deref().unwrap_or(UNLABELED))
                .or_default()
                .push(g);
        }

        let mut lines = Vec::new();
        for (label, members) in by_label {
            let mean_of_means =
                members.iter().map(|g| g.summary.mean).sum::<f64>() / members.len() as f64;
            let warnings = members.iter().filter(|g| g.warning).count();
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!(
                "{label}: mean {} | groups: {} | warnings: {}",
                o.with_unit(mean_of_means),
                members.len(),
                warnings
            ));
            for g in members {
                lines.push(format!(
                    "  {:<w$}  {}",
                    g.name,
                    o.with_unit(g.summary.mean),
                    w = self.name_width
                ));
            }
        }

        Section {
            kind: SectionKind::Categories,
            title: "CATEGORY BREAKDOWN".into(),
            lines,
        }
    }
}
