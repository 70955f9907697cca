use thiserror::Error;

/// Failures surfaced by the service client and the model catalog.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{operation} failed: {code}: {message}")]
    Service {
        operation: &'static str,
        code: String,
        message: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model catalog: {0}")]
    Catalog(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;
