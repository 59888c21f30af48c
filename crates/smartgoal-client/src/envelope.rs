//! The uniform response envelope returned by every client call.
//!
//! Client methods never return `Err` directly. They hand back an
//! [`ApiResponse`] carrying the outcome, the HTTP status when one was
//! received, and how long the call took. The rules for turning a raw
//! response into an outcome live in [`decode_body`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Outcome of one API call.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// Parsed data or the normalized error.
    pub outcome: Result<T, ApiError>,
    /// Wall-clock time the call took.
    pub elapsed: Duration,
    /// HTTP status code, absent when no response was received.
    pub status: Option<u16>,
}

impl<T> ApiResponse<T> {
    /// Builds an envelope for a call that failed before any response.
    #[must_use]
    pub const fn failed(error: ApiError, elapsed: Duration) -> Self {
        Self {
            outcome: Err(error),
            elapsed,
            status: None,
        }
    }

    /// Returns `true` if the call produced data.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The parsed data, if the call succeeded.
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The human-readable error message, if the call failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.outcome.as_ref().err().map(ToString::to_string)
    }

    /// Converts the envelope into a plain `Result`, dropping timing.
    pub fn into_result(self) -> Result<T, ApiError> {
        self.outcome
    }

    /// Maps the data while keeping status and timing.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            outcome: self.outcome.map(f),
            elapsed: self.elapsed,
            status: self.status,
        }
    }
}

/// Turns a received response into data or an [`ApiError`].
///
/// In order of precedence:
///
/// 1. an unparseable body is [`ApiError::TooLarge`] for 413, otherwise
///    [`ApiError::Parse`] (carrying the reason phrase when not 2xx);
/// 2. a JSON body with a non-empty `detail` field is [`ApiError::Detail`],
///    whatever the status;
/// 3. a non-2xx status is [`ApiError::Status`];
/// 4. a 2xx body that does not match `T` is [`ApiError::Parse`].
pub fn decode_body<T: DeserializeOwned>(
    status: u16,
    reason: &str,
    body: &[u8],
) -> Result<T, ApiError> {
    let success = (200..300).contains(&status);

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) if status == 413 => {
            tracing::debug!(error = %e, "Unparseable 413 body");
            return Err(ApiError::TooLarge);
        }
        Err(e) => {
            return Err(ApiError::Parse {
                status,
                reason: (!success).then(|| reason_or_code(status, reason)),
                source_message: e.to_string(),
            });
        }
    };

    if let Some(detail) = extract_detail(&value) {
        return Err(ApiError::Detail { status, detail });
    }

    if !success {
        return Err(ApiError::status(status, reason_or_code(status, reason)));
    }

    serde_json::from_value(value).map_err(|e| ApiError::Parse {
        status,
        reason: None,
        source_message: e.to_string(),
    })
}

fn reason_or_code(status: u16, reason: &str) -> String {
    if reason.is_empty() {
        format!("HTTP {status}")
    } else {
        reason.to_string()
    }
}

/// Pulls a message out of a `detail` field.
///
/// Strings are used as-is; a list of validation errors is reduced to their
/// `msg` fields joined with `; `.
fn extract_detail(value: &Value) -> Option<String> {
    match value.get("detail")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map_or_else(|| item.to_string(), str::to_string)
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    }
}
