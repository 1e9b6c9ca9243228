use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Augmentation error: {0}")]
    Augmentation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TriageError {
    /// True for failures caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TriageError::Validation(_))
    }
}

impl From<config::ConfigError> for TriageError {
    fn from(err: config::ConfigError) -> Self {
        TriageError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
