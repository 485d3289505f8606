//! Error types for the composable-aldex2 library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DaaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Invalid statistic '{value}' at row {row}, column '{column}'")]
    InvalidStatistic {
        value: String,
        row: usize,
        column: String,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to start ALDEx2 engine '{program}': {source}")]
    EngineSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ALDEx2 engine exited with {}", describe_exit(.code))]
    EngineFailed { code: Option<i32> },

    #[error("Infeasible threshold: {0}")]
    ThresholdInfeasible(String),

    #[error("Unknown test '{0}' (expected one of: welch, wilcoxon)")]
    UnknownTest(String),

    #[error("Pipeline error: {message}")]
    Pipeline {
        message: String,
        #[source]
        source: Option<Box<DaaError>>,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DaaError {
    /// The innermost error, looking through pipeline step wrappers.
    pub fn root(&self) -> &DaaError {
        match self {
            DaaError::Pipeline {
                source: Some(inner),
                ..
            } => inner.root(),
            other => other,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("return code {}", code),
        None => "no return code (terminated by signal)".to_string(),
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DaaError>;
