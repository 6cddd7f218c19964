//! Shared types for the signing module

/// Errors that can occur during signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("envelope is missing its {0}")]
    MissingHash(&'static str),
}

pub type SigningResult<T> = Result<T, SigningError>;
