//! Error types for catchup
//!
//! `AppError` covers everything that ends the process. `FetchError` covers a
//! single failed poll; those are shown on the status line and retried.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Giving up after {failures} consecutive failed polls (last error: {last_error})")]
    FailureLimit { failures: u32, last_error: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Why a single poll of the metrics endpoint failed
///
/// None of these are fatal. The controller shows them and polls again on
/// the next tick.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("creating GET request for URL {url:?} failed: {source}")]
    RequestConstruction {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("executing GET request for URL {url:?} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET request for URL {url:?} got no response headers within {timeout_secs}s")]
    HeaderTimeout { url: String, timeout_secs: u64 },

    #[error("GET request for URL {url:?} returned HTTP status {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("reading text format from URL {url:?} failed: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("aggregator stopped receiving samples")]
    AggregatorClosed,
}

/// A payload that is not valid Prometheus text exposition format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("text format parsing error in line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}
