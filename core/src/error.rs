use crate::stage::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stage '{stage}' requires '{requires}' to run first")]
    StageOutOfOrder { stage: Stage, requires: Stage },

    #[error("Stage '{stage}' already completed; load new data to run it again")]
    StageAlreadyCompleted { stage: Stage },

    #[error("No data loaded")]
    NothingLoaded,

    #[error("Stage '{stage}' needs the '{column}' column group")]
    MissingColumn { stage: &'static str, column: &'static str },

    #[error("Stage '{stage}' changed the row count: expected {expected}, got {actual}")]
    RowCountMismatch { stage: &'static str, expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
