//! Error types for the cf-ddns system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for cf-ddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cf-ddns system
#[derive(Error, Debug)]
pub enum Error {
    /// No interface (or the unbound probe) produced a usable public IPv4 address
    #[error("Cannot get public IPv4 address")]
    NoAddressResolved,

    /// The target hostname has no record basis in the zone
    #[error("Unknown host: {0} has no records in the zone")]
    UnknownHost(String),

    /// The provider reported `success: false`
    #[error("{message} (code: {code})")]
    Provider {
        /// First error code reported by the provider
        code: i64,
        /// First error message reported by the provider
        message: String,
    },

    /// Transport-level failure talking to a remote service
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with something we could not interpret
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Snapshot cache errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a provider error from the first `{code, message}` pair
    pub fn provider(code: i64, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
        }
    }

    /// Create an unknown host error
    pub fn unknown_host(hostname: impl Into<String>) -> Self {
        Self::UnknownHost(hostname.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
