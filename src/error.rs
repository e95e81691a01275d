//! Error handling for mfdash
//!
//! Defines the typed failures of an ingestion run and of configuration
//! loading, and establishes a unified Result type using anyhow for
//! context chaining everywhere else.

use thiserror::Error;

/// Why an ingestion run did not complete.
///
/// Every variant leaves the snapshot store exactly as it was before the run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("broker session is invalid or expired; re-authenticate and update the access token")]
    Unauthenticated,

    #[error("broker unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("broker reported a holding whose values are out of range: {0}")]
    MalformedHolding(String),

    #[error("failed to write snapshots: {0}")]
    StoreWriteFailure(String),
}

/// Configuration problems detected at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid schedule '{0}': expected \"<minute> <hour> * * *\"")]
    InvalidSchedule(String),

    #[error("missing broker credential: {0}")]
    MissingCredential(&'static str),
}

/// Result type alias for everything outside the ingestion boundary
pub type Result<T> = anyhow::Result<T>;
