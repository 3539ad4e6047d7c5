//! Built-in demonstration dataset: daily rainfall (mm) for five states,
//! four stations each, labelled by region.

use tally_core::{Dataset, Deviation, Group, TallyResult};

use crate::Defaults;

/// The readings are every station of each state, so the spread is a
/// population deviation.
pub const SAMPLE_DEFAULTS: Defaults = Defaults {
    title: "DAILY RAINFALL ANALYSIS REPORT",
    unit: "mm",
    deviation: Deviation::Population,
};

pub fn sample_dataset() -> TallyResult<Dataset> {
    Dataset::from_groups([
        Group::new("Lagos", vec![12.0, 15.0, 9.0, 14.0]).with_label("Southern Region"),
        Group::new("Rivers", vec![18.0, 20.0, 22.0, 19.0]).with_label("Southern Region"),
        Group::new("Bayelsa", vec![22.0, 20.0, 21.0, 23.0]).with_label("Southern Region"),
        Group::new("Kano", vec![3.0, 4.0, 2.0, 5.0]).with_label("Northern Region"),
        Group::new("Enugu", vec![11.0, 12.0, 10.0, 13.0]).with_label("Eastern Region"),
    ])
}
