//! Error types for the APICURON action core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required action input or config field is missing.
    #[error("required input '{0}' is not set")]
    MissingInput(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Event errors
// ---------------------------------------------------------------------------

/// Errors from loading the push event payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event file does not exist.
    #[error("event payload not found: {0}")]
    FileNotFound(String),

    /// The event payload is not valid JSON for a push event.
    #[error("event payload parse error: {0}")]
    ParseError(String),

    /// Generic I/O error reading the event file.
    #[error("event I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Assembly errors
// ---------------------------------------------------------------------------

/// Structural problems that abort report assembly as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// The event has no commit list, or an empty one.
    #[error("No commits found in the payload")]
    NoCommits,

    /// The event carries no repository descriptor.
    #[error("No repository found in the payload")]
    MissingRepository,

    /// A commit entry in the list is `null`.
    #[error("Commit at index {0} is undefined or null")]
    NullCommit(usize),

    /// A report setting that every record needs is blank.
    #[error("report setting '{0}' must not be empty")]
    EmptySetting(&'static str),
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from ORCID identity lookups.
///
/// These never escape [`crate::identity::IdentityResolver::resolve`]; they
/// are logged and degraded to [`crate::identity::Resolution::Unresolved`].
/// Loading a mapping file is the exception and fails normally.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP-level transport error (network, TLS, DNS, etc.).
    #[error("identity service HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The identity service returned a status outside 2xx and 4xx.
    #[error("HTTP error! status: {0}")]
    UnexpectedStatus(u16),

    /// The response body was not the expected JSON shape.
    #[error("identity response parse error: {0}")]
    ParseError(String),

    /// The ORCID mapping file could not be loaded.
    #[error("ORCID mapping file error at '{path}': {detail}")]
    MappingFileError { path: String, detail: String },

    /// Generic I/O error.
    #[error("identity I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Submission errors
// ---------------------------------------------------------------------------

/// Errors from submitting a report batch to APICURON.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Connection refused, timeout, DNS failure and the like.
    #[error("APICURON transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status. The batch is undelivered.
    #[error("API request failed: {status} {reason}")]
    Rejected {
        status: u16,
        reason: String,
        body: String,
    },

    /// The request body could not be serialized.
    #[error("failed to serialize report batch: {0}")]
    Serialize(String),
}

impl SubmissionError {
    /// HTTP status carried by a rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Serialize(_) => None,
        }
    }
}

// CoreError implements `std::error::Error` via `thiserror`, so the binary can
// wrap it in `anyhow::Error` through the blanket impl.
