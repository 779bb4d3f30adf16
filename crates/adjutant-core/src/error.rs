//! Error types for the Adjutant application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Adjutant application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Every variant renders as a
/// single human-readable line, which is all the REPL ever shows.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum AdjutantError {
    /// Network or HTTP failure, carrying the remote structured error message
    /// or the raw response body when none could be parsed.
    #[error("API error: {message}")]
    Transport { message: String },

    /// A precondition was not met (missing assistant/thread, empty input,
    /// a turn already in flight). No network call was made.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A run ended in a terminal state other than `completed`.
    #[error("Run {status}: {detail}")]
    RunTerminal { status: String, detail: String },

    /// The run was still pending when the configured poll budget ran out.
    #[error("Run still pending after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// Configuration error (missing or unreadable secret file, missing key).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdjutantError {
    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a RunTerminal error
    pub fn run_terminal(status: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::RunTerminal {
            status: status.into(),
            detail: detail.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a RunTerminal error
    pub fn is_run_terminal(&self) -> bool {
        matches!(self, Self::RunTerminal { .. })
    }
}

impl From<std::io::Error> for AdjutantError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for AdjutantError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A type alias for `Result<T, AdjutantError>`.
pub type Result<T> = std::result::Result<T, AdjutantError>;
