//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Provider, parse and validation errors are handled inside the analysis
//! pipeline; only [`AnalysisError`] reaches callers of `analyze`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("AI provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome classes of a single remote generation call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("model not found: {0}")]
    NotFound(String),

    #[error("input modality not supported: {0}")]
    UnsupportedModality(String),

    #[error("invalid credential: {0}")]
    Authentication(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("empty answer from model")]
    EmptyResponse,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl ProviderError {
    /// Failures worth one more immediate attempt against the same model.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Malformed(_)
                | ProviderError::EmptyResponse
                | ProviderError::Api { .. }
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON array or object found in model output")]
    NoStructuredData,

    #[error("model output contained an empty list")]
    EmptyResult,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid number for '{field}': {value}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Failures surfaced to callers of the analysis pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("all model candidates exhausted after {attempts} remote calls")]
    Exhausted { attempts: usize },

    #[error("authentication failed: {0}")]
    Authentication(String),
}
