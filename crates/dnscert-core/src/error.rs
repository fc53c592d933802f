//! Error types for dnscert
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnscert operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnscert
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (invalid ACME directory, bad certificate list, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account or certificate store failures
    #[error("Store error: {0}")]
    Store(String),

    /// Stored certificate data could not be parsed
    #[error("Certificate parse error: {0}")]
    Parse(String),

    /// The zone has corrections pending before any challenge record was published
    #[error(
        "found {count} pending corrections for {zone}. Not going to proceed issuing certificates"
    )]
    PendingDrift {
        /// Zone name
        zone: String,
        /// Number of pending corrections
        count: usize,
    },

    /// A correction failed while being applied to a zone
    #[error("Reconciliation of {zone} failed: {message}")]
    Reconciliation {
        /// Zone name
        zone: String,
        /// Error message
        message: String,
    },

    /// The certificate authority rejected an order
    #[error("ACME protocol error: {0}")]
    Protocol(String),

    /// The certificate was obtained or renewed, but a later step failed
    #[error("Certificate changed but a follow-up step failed: {0}")]
    Degraded(Box<Error>),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a certificate parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a pending drift error
    pub fn pending_drift(zone: impl Into<String>, count: usize) -> Self {
        Self::PendingDrift {
            zone: zone.into(),
            count,
        }
    }

    /// Create a reconciliation error
    pub fn reconciliation(zone: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reconciliation {
            zone: zone.into(),
            message: message.into(),
        }
    }

    /// Create an ACME protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Wrap an error raised after the certificate already changed
    pub fn degraded(err: Error) -> Self {
        match err {
            Self::Degraded(_) => err,
            other => Self::Degraded(Box::new(other)),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the certificate was obtained or renewed despite this error
    ///
    /// Callers should treat such errors as a success that needs operator
    /// attention (persistence or cleanup failed), not as a failed issuance.
    pub fn certificate_changed(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
