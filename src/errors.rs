/// Domain-specific error types for the hedging simulator.
/// Every failure is fail-fast. The simulator must:
/// - Reject bad parameters at construction, never mid-run
/// - Surface undefined numeric results instead of coercing them
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("degenerate computation: {0}")]
    DegenerateComputation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for SimError {
    fn from(e: rusqlite::Error) -> Self {
        SimError::Database(e.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
