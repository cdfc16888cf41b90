//! Unified error system for the Zonia SDK
//!
//! Every public operation reports failures through [`ZoniaError`]. Callers
//! branch on [`ZoniaError::kind`]; the message is diagnostic text only and is
//! not part of the contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error classification that callers are expected to match on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Referenced post, channel or canister is absent
    NotFound,
    /// Malformed request or configuration
    InvalidInput,
    /// Transport failure, remote fault or unexpected condition
    Internal,
}

impl ErrorKind {
    /// Get a short label for this kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::InvalidInput => "invalid input",
            Self::Internal => "internal",
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unified error type for all Zonia operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ZoniaError {
    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl ZoniaError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Diagnostic message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message }
            | Self::InvalidInput { message }
            | Self::Internal { message } => message,
        }
    }
}

/// Standard Result type for Zonia operations
pub type Result<T> = std::result::Result<T, ZoniaError>;

impl From<candid::Error> for ZoniaError {
    fn from(err: candid::Error) -> Self {
        Self::internal(format!("candid codec: {err}"))
    }
}

impl From<std::io::Error> for ZoniaError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}
