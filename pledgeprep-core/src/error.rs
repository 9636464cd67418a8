//! Error types for the pledgeprep-core crate.

use thiserror::Error;

/// Top-level error type for dataset preparation.
///
/// None of these are retried: every stage returns the first failure to the
/// caller and the run stops there.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Schema violation: {0}")]
    Schema(String),

    #[error("Label error: {0}")]
    Label(String),

    #[error("Stratification error: {0}")]
    Stratification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote fetch failed: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl PrepError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn label(msg: impl Into<String>) -> Self {
        Self::Label(msg.into())
    }

    pub fn stratification(msg: impl Into<String>) -> Self {
        Self::Stratification(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}
