use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("insufficient data: need at least {needed} readings, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("group has no readings: {0}")]
    EmptyGroup(String),

    #[error("duplicate group: {0}")]
    DuplicateGroup(String),

    #[error("non-finite reading in group {group} at position {index}")]
    NonFiniteReading { group: String, index: usize },

    #[error("invalid report option: {0}")]
    InvalidOption(String),

    #[error("{0} overflowed to a non-finite value")]
    Overflow(&'static str),
}

pub type TallyResult<T> = Result<T, TallyError>;
