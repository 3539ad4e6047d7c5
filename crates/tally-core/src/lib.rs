pub mod aggregate;
pub mod dataset;
pub mod error;
pub mod rank;
pub mod report;
pub mod stats;
pub mod threshold;

pub use aggregate::{compute_aggregate, AggregateStatistics, ExtremeReading};
pub use dataset::{Dataset, Group, GroupStatistics};
pub use error::{TallyError, TallyResult};
pub use rank::{rank_groups, ranked, Order};
pub use report::{
    render_report, validate_precision, Report, ReportOptions, Section, SectionKind, MAX_PRECISION,
    MIN_PRECISION,
};
pub use stats::{compute_group_stats, Deviation, Extreme, Summary};
pub use threshold::{
    classify, classify_variability, Comparison, Metric, Stability, Threshold, VariabilityBands,
};
