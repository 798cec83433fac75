//! Error types for the Cloudflare DDNS updater
//!
//! Every fallible operation in this crate returns [`Result`]. The variants
//! follow one taxonomy so the orchestrator can decide, per failure, whether
//! to continue with another zone candidate, skip one address family or give
//! up on the whole run.

use std::fmt;

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input violates a length/format precondition
    #[error("Usage error: {0}")]
    Usage(String),

    /// Transport-level failure (connection, TLS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Cloudflare answered with a non-success status
    #[error("Cloudflare API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// First error message from the API envelope, or the raw body
        message: String,
    },

    /// The API token was rejected
    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication {
        /// HTTP status code (401 or 403)
        status: u16,
        /// Message reported by the API
        message: String,
    },

    /// No zone owns the record name, after trying every suffix
    #[error("Zone not found for {name}{}", last_error_suffix(.last_error))]
    ZoneNotFound {
        /// The record name that was searched
        name: String,
        /// The last per-candidate failure, if any candidate failed
        last_error: Option<String>,
    },

    /// The zone has no A or AAAA record with this name
    #[error("No A/AAAA record found for {0}")]
    NoMatchingRecord(String),

    /// A fixed-capacity buffer cannot hold the data
    #[error("Buffer too small: {required} bytes required, capacity is {capacity}")]
    BufferTooSmall {
        /// Bytes that would have been needed
        required: usize,
        /// Capacity of the buffer
        capacity: usize,
    },

    /// The PATCH of a record failed
    #[error("Update of record {record} failed: {source}")]
    UpdateFailed {
        /// Record ID that was being updated
        record: String,
        /// Underlying transport or parse failure
        #[source]
        source: Box<Error>,
    },

    /// Zone cache I/O errors
    #[error("Zone cache error: {0}")]
    Cache(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a failure that happened while updating `record`
    pub fn update_failed(record: impl Into<String>, source: Error) -> Self {
        Self::UpdateFailed {
            record: record.into(),
            source: Box::new(source),
        }
    }

    /// Errors that no retry or other zone candidate can fix.
    ///
    /// These abort the iterative zone search immediately.
    pub fn is_usage_class(&self) -> bool {
        matches!(
            self,
            Error::Usage(_)
                | Error::Config(_)
                | Error::Authentication { .. }
                | Error::BufferTooSmall { .. }
        )
    }

    /// Domain-level absence (no zone, no record)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ZoneNotFound { .. } | Error::NoMatchingRecord(_))
    }

    /// Failures a caller may reasonably retry later
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Parse(_) | Error::Api { .. } => true,
            Error::UpdateFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Workflow stage a fatal failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Public IP discovery
    IpDiscovery,
    /// Zone ID resolution (cache or iterative search)
    ZoneResolution,
    /// Fetching the current A/AAAA records
    RecordFetch,
    /// PATCHing a record
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::IpDiscovery => "IP discovery",
            Stage::ZoneResolution => "zone resolution",
            Stage::RecordFetch => "record fetch",
            Stage::Update => "update",
        })
    }
}

/// A fatal run failure, tagged with the stage it happened in
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    /// Stage that failed
    pub stage: Stage,
    /// Underlying cause
    #[source]
    pub source: Error,
}

impl StageError {
    /// Attach a stage to an error
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}
