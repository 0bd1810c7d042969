use serde::Deserialize;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced by the API client.
///
/// Only `Transport` and `Server` are retryable: a timeout already cost the
/// caller the full request budget, and 4xx responses are definitive.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ApiError>,
    },
}

/// Error body the server sends with 4xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<String>,
}

impl ApiError {
    /// Classify a reqwest failure. Timeouts get their own variant so the
    /// retry loop can abort instead of waiting out the budget again.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }

    /// Classify a non-2xx response by status, extracting the server-supplied
    /// message from 4xx bodies when present.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        if status.is_server_error() {
            ApiError::Server {
                status: status.as_u16(),
                body: truncated,
            }
        } else if status.is_client_error() {
            let message = match serde_json::from_str::<ErrorBody>(body) {
                Ok(parsed) => parsed.error,
                Err(_) => truncated,
            };
            ApiError::Client {
                status: status.as_u16(),
                message,
            }
        } else {
            ApiError::InvalidResponse(format!("unexpected status {}: {}", status, truncated))
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Server { .. })
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }
}
