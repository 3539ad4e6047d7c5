mod config;
mod input;
mod sample;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use tally_core::{
    compute_aggregate, compute_group_stats, ranked, validate_precision, AggregateStatistics,
    Comparison, Dataset, Deviation, GroupStatistics, Metric, Order, Report, ReportOptions,
    Threshold,
};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Descriptive statistics and threshold reports for grouped readings"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a full report for a dataset file (JSON, TOML or text; `-` for stdin)
    Report {
        /// Dataset file
        file: PathBuf,

        #[command(flatten)]
        args: ReportArgs,
    },

    /// Summarize numbers given on the command line
    Stats {
        /// Readings
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,

        /// Standard deviation divisor
        #[arg(short, long)]
        deviation: Option<CliDeviation>,

        /// Decimal places (2-4)
        #[arg(short, long)]
        precision: Option<usize>,
    },

    /// Rank the groups of a dataset by one statistic
    Rank {
        /// Dataset file
        file: PathBuf,

        /// Statistic to rank by
        #[arg(short, long, default_value = "mean")]
        by: CliMetric,

        /// Sort order
        #[arg(short, long, default_value = "desc")]
        order: CliOrder,

        /// Keep only the first N groups
        #[arg(short, long)]
        limit: Option<usize>,

        /// Standard deviation divisor
        #[arg(short, long)]
        deviation: Option<CliDeviation>,
    },

    /// Render a report for the built-in rainfall sample
    Sample {
        #[command(flatten)]
        args: ReportArgs,
    },

    /// Show current configuration
    Config,
}

/// Report flags. Anything left unset falls back to the config file.
#[derive(Args)]
struct ReportArgs {
    /// Warning threshold value
    #[arg(short, long, allow_negative_numbers = true)]
    threshold: Option<f64>,

    /// How the statistic is compared with the threshold
    #[arg(long)]
    comparison: Option<CliComparison>,

    /// Statistic the threshold applies to
    #[arg(long)]
    warn_on: Option<CliMetric>,

    /// Standard deviation divisor
    #[arg(short, long)]
    deviation: Option<CliDeviation>,

    /// Decimal places (2-4)
    #[arg(short, long)]
    precision: Option<usize>,

    /// Entries in the top and bottom rankings
    #[arg(long)]
    top: Option<usize>,

    /// Statistic the rankings use
    #[arg(long)]
    rank_by: Option<CliMetric>,

    /// Report title
    #[arg(long)]
    title: Option<String>,

    /// Unit shown next to values
    #[arg(short, long)]
    unit: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDeviation {
    Sample,
    Population,
}

impl From<CliDeviation> for Deviation {
    fn from(val: CliDeviation) -> Self {
        match val {
            CliDeviation::Sample => Deviation::Sample,
            CliDeviation::Population => Deviation::Population,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliComparison {
    /// statistic > threshold
    Gt,
    /// statistic >= threshold
    Ge,
}

impl From<CliComparison> for Comparison {
    fn from(val: CliComparison) -> Self {
        match val {
            CliComparison::Gt => Comparison::GreaterThan,
            CliComparison::Ge => Comparison::GreaterOrEqual,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMetric {
    Mean,
    Median,
    Min,
    Max,
    Range,
    StdDev,
    Sum,
    Count,
}

impl From<CliMetric> for Metric {
    fn from(val: CliMetric) -> Self {
        match val {
            CliMetric::Mean => Metric::Mean,
            CliMetric::Median => Metric::Median,
            CliMetric::Min => Metric::Min,
            CliMetric::Max => Metric::Max,
            CliMetric::Range => Metric::Range,
            CliMetric::StdDev => Metric::StdDev,
            CliMetric::Sum => Metric::Sum,
            CliMetric::Count => Metric::Count,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliOrder {
    Asc,
    Desc,
}

impl From<CliOrder> for Order {
    fn from(val: CliOrder) -> Self {
        match val {
            CliOrder::Asc => Order::Ascending,
            CliOrder::Desc => Order::Descending,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Report { file, args } => {
            let cfg = config::load_config(config_path)?;
            let dataset = input::load_dataset(&file)?;
            cmd_report(&cfg, &dataset, &args, None)
        }
        Commands::Stats {
            values,
            deviation,
            precision,
        } => {
            let cfg = config::load_config(config_path)?;
            cmd_stats(&cfg, &values, deviation, precision)
        }
        Commands::Rank {
            file,
            by,
            order,
            limit,
            deviation,
        } => {
            let cfg = config::load_config(config_path)?;
            let dataset = input::load_dataset(&file)?;
            cmd_rank(&cfg, &dataset, by.into(), order.into(), limit, deviation)
        }
        Commands::Sample { args } => {
            let cfg = config::load_config(config_path)?;
            let dataset = sample::sample_dataset()?;
            cmd_report(&cfg, &dataset, &args, Some(&sample::SAMPLE_DEFAULTS))
        }
        Commands::Config => cmd_config(config_path),
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Built-in values a command uses instead of the config file's.
/// Command-line flags still win over these.
pub struct Defaults {
    pub title: &'static str,
    pub unit: &'static str,
    pub deviation: Deviation,
}

/// Config values with command-line overrides applied.
struct Settings {
    deviation: Deviation,
    threshold: Threshold,
    options: ReportOptions,
}

fn resolve_settings(
    cfg: &Config,
    args: &ReportArgs,
    defaults: Option<&Defaults>,
) -> Result<Settings> {
    let threshold = Threshold::new(
        args.threshold.unwrap_or(cfg.threshold.value),
        args.comparison
            .map(Comparison::from)
            .unwrap_or(cfg.threshold.comparison),
        args.warn_on.map(Metric::from).unwrap_or(cfg.threshold.metric),
    )
    .context("invalid threshold")?;

    let (default_title, default_unit, default_deviation) = match defaults {
        Some(d) => (d.title.to_string(), Some(d.unit.to_string()), d.deviation),
        None => (
            cfg.report.title.clone(),
            cfg.report.unit.clone(),
            cfg.report.deviation,
        ),
    };

    let options = ReportOptions {
        title: args.title.clone().unwrap_or(default_title),
        unit: args.unit.clone().or(default_unit),
        precision: args.precision.unwrap_or(cfg.report.precision),
        rank_metric: args
            .rank_by
            .map(Metric::from)
            .unwrap_or(cfg.report.rank_metric),
        rank_limit: args.top.unwrap_or(cfg.report.rank_limit),
        bands: cfg.variability,
        threshold: Some(threshold),
        generated_at: Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    };
    options.validate().context("invalid report options")?;

    Ok(Settings {
        deviation: args
            .deviation
            .map(Deviation::from)
            .unwrap_or(default_deviation),
        threshold,
        options,
    })
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct JsonReport<'a> {
    groups: &'a [GroupStatistics],
    aggregate: &'a AggregateStatistics,
    report: &'a Report,
}

fn cmd_report(
    cfg: &Config,
    dataset: &Dataset,
    args: &ReportArgs,
    defaults: Option<&Defaults>,
) -> Result<()> {
    let settings = resolve_settings(cfg, args, defaults)?;
    let groups = dataset.group_statistics(settings.deviation, &settings.threshold)?;
    let aggregate = compute_aggregate(&groups)?;
    let report = Report::build(&groups, &aggregate, &settings.options)?;

    let text = match args.format {
        OutputFormat::Text => report.render(),
        OutputFormat::Json => {
            let out = JsonReport {
                groups: &groups,
                aggregate: &aggregate,
                report: &report,
            };
            serde_json::to_string_pretty(&out)? + "\n"
        }
    };

    match &args.output {
        Some(path) => {
            write_output(path, &text)?;
            println!(
                "Report written to {} ({} groups, {} warnings).",
                path.display(),
                aggregate.group_count,
                aggregate.warning_count
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = text.len(), "report written");
    Ok(())
}

fn cmd_stats(
    cfg: &Config,
    values: &[f64],
    deviation: Option<CliDeviation>,
    precision: Option<usize>,
) -> Result<()> {
    let p = precision.unwrap_or(cfg.report.precision);
    validate_precision(p)?;
    let dataset = input::dataset_from_values(values)?;
    let deviation = deviation.map(Deviation::from).unwrap_or(cfg.report.deviation);
    let s = compute_group_stats(&dataset.pooled(), deviation)?;

    println!("Count:    {}", s.count);
    println!("Sum:      {:.p$}", s.sum);
    println!("Mean:     {:.p$}", s.mean);
    println!("Median:   {:.p$}", s.median);
    println!("Std dev:  {:.p$} ({})", s.std_dev, s.deviation);
    println!("Min:      {:.p$} (position {})", s.min.value, s.min.index + 1);
    println!("Max:      {:.p$} (position {})", s.max.value, s.max.index + 1);
    println!("Range:    {:.p$}", s.range());
    Ok(())
}

fn cmd_rank(
    cfg: &Config,
    dataset: &Dataset,
    metric: Metric,
    order: Order,
    limit: Option<usize>,
    deviation: Option<CliDeviation>,
) -> Result<()> {
    for line in rank_lines(cfg, dataset, metric, order, limit, deviation)? {
        println!("{line}");
    }
    Ok(())
}

fn rank_lines(
    cfg: &Config,
    dataset: &Dataset,
    metric: Metric,
    order: Order,
    limit: Option<usize>,
    deviation: Option<CliDeviation>,
) -> Result<Vec<String>> {
    let p = cfg.report.precision;
    validate_precision(p).context("invalid [report] precision")?;
    let threshold = cfg.threshold.to_threshold()?;
    let deviation = deviation.map(Deviation::from).unwrap_or(cfg.report.deviation);
    let groups = dataset.group_statistics(deviation, &threshold)?;

    let limit = limit.unwrap_or(groups.len());
    Ok(ranked(&groups, metric, order)
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, g)| {
            format!(
                "{:>3}. {}  {metric} = {:.p$}",
                i + 1,
                g.name,
                metric.value(&g.summary)
            )
        })
        .collect())
}

fn cmd_config(explicit: Option<&Path>) -> Result<()> {
    let cfg = config::load_config(explicit)?;
    println!("Config: {}", config::show_config_path(explicit));
    println!();
    println!("[report]");
    println!("  title = {}", cfg.report.title);
    println!("  unit = {}", cfg.report.unit.as_deref().unwrap_or("(none)"));
    println!("  precision = {}", cfg.report.precision);
    println!("  rank_metric = {}", cfg.report.rank_metric);
    println!("  rank_limit = {}", cfg.report.rank_limit);
    println!("  deviation = {}", cfg.report.deviation);
    println!();
    println!("[threshold]");
    println!("  value = {}", cfg.threshold.value);
    println!("  comparison = {}", cfg.threshold.comparison);
    println!("  metric = {}", cfg.threshold.metric);
    println!();
    println!("[variability]");
    println!("  stable_below = {}", cfg.variability.stable_below);
    println!("  moderate_below = {}", cfg.variability.moderate_below);
    Ok(())
}
