//! Error types for the smartgoal core crate.
//!
//! Covers configuration loading, draft validation (attempt and feedback
//! payloads checked before they reach the backend), and session lookups.

use std::path::PathBuf;

/// A specialized `Result` type for smartgoal core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the smartgoal core.
///
/// Configuration variants carry an actionable suggestion for the user.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error(
        "Invalid JSON in config file '{path}': {message}\n\n\
         Suggestion: Validate your smartgoal.json with a JSON linter"
    )]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Draft Validation Errors
    // ========================================================================
    /// A feedback draft failed validation.
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    /// An attempt draft failed validation.
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// An operation needed a logged-in user but the session is anonymous.
    #[error("Not logged in\n\nSuggestion: Log in through the backend and pass the session cookie")]
    NotLoggedIn,

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidFeedback` error.
    #[must_use]
    pub fn invalid_feedback(message: impl Into<String>) -> Self {
        Self::InvalidFeedback(message.into())
    }

    /// Creates a new `InvalidSubmission` error.
    #[must_use]
    pub fn invalid_submission(message: impl Into<String>) -> Self {
        Self::InvalidSubmission(message.into())
    }

    /// Returns `true` if the error was caused by user-supplied draft content.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidFeedback(_) | Self::InvalidSubmission(_))
    }
}
