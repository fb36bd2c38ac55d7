use std::path::PathBuf;

use cic_client::CicError;
use thiserror::Error;

use crate::correlate::CorrelationError;

pub type Result<T> = std::result::Result<T, WaveError>;

/// Errors from fetching, storing and analysing wave build data.
#[derive(Debug, Error)]
pub enum WaveError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to decode {origin}: {source}")]
    Decode {
        origin: String,
        source: serde_json::Error,
    },

    #[error("Jenkins request to {url} failed with HTTP {status}: {body}")]
    Jenkins {
        url: String,
        status: u16,
        body: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("credentials file {path} must contain one 'user:password' line")]
    Credentials { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Cic(#[from] CicError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

impl From<config::ConfigError> for WaveError {
    fn from(err: config::ConfigError) -> Self {
        WaveError::Config(err.to_string())
    }
}
