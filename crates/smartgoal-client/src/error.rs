//! Error types for backend API calls.
//!
//! Every failure a request can meet is folded into one [`ApiError`], whose
//! `Display` is the single message shown to the user.

use std::path::PathBuf;

use smartgoal_core::CoreError;

/// Suffix appended when a response body cannot be parsed.
pub const PARSE_FAILURE_SUFFIX: &str = "(Failed to parse response)";

/// Errors produced by [`crate::ApiClient`] calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout).
    #[error("API error: {0}")]
    Transport(String),

    /// Non-2xx response without a server-supplied detail.
    #[error("{reason}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status.
        reason: String,
    },

    /// The response body could not be parsed into the expected shape.
    #[error("{}", parse_message(.reason.as_deref()))]
    Parse {
        /// HTTP status code.
        status: u16,
        /// Reason phrase if the status was not successful.
        reason: Option<String>,
        /// Decoder error, kept for logs.
        source_message: String,
    },

    /// 413 response whose body could not be parsed.
    #[error("Request was too large")]
    TooLarge,

    /// The server explained the failure in a `detail` field.
    #[error("{detail}")]
    Detail {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message.
        detail: String,
    },

    /// A draft was rejected before it was sent.
    #[error("{0}")]
    Validation(#[from] CoreError),

    /// A local file to upload could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    ReadFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

fn parse_message(reason: Option<&str>) -> String {
    match reason.filter(|r| !r.is_empty()) {
        Some(reason) => format!("{reason} {PARSE_FAILURE_SUFFIX}"),
        None => PARSE_FAILURE_SUFFIX.to_string(),
    }
}

impl ApiError {
    /// Creates a transport error from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Creates a status error.
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    /// HTTP status code carried by the error, if a response was received.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. }
            | Self::Parse { status, .. }
            | Self::Detail { status, .. } => Some(*status),
            Self::TooLarge => Some(413),
            Self::Transport(_) | Self::Validation(_) | Self::ReadFile { .. } | Self::Client(_) => {
                None
            }
        }
    }

    /// Returns `true` if retrying the same request later might succeed.
    ///
    /// Covers transport failures and 5xx responses.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            _ => matches!(self.http_status(), Some(500..=599)),
        }
    }

    /// Returns `true` if the draft never left the client.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
