//! Failure taxonomy for calls through the HTTP pipeline.
//!
//! Every failure maps to exactly one [`ErrorKind`], and every kind has a
//! fixed user-facing message except `OtherHttp`, which prefers whatever the
//! backend said.

use serde_json::Value;

pub const SERVER_ERROR_MESSAGE: &str = "Internal server error, please try again later";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized, please log in again";
pub const FORBIDDEN_MESSAGE: &str = "Permission denied";
pub const NETWORK_ERROR_MESSAGE: &str = "Network request failed, please check your connection";
pub const TIMEOUT_MESSAGE: &str = "Request timed out, please check your connection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 5xx.
    ServerError,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// Any other non-success status.
    OtherHttp,
    /// No response: connection refused, DNS failure, reset.
    Network,
    /// Client-side request timeout.
    Timeout,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("server error (HTTP {status})")]
    Server { status: u16, body: Value },
    #[error("unauthorized (HTTP 401)")]
    Unauthorized { body: Value },
    #[error("forbidden (HTTP 403)")]
    Forbidden { body: Value },
    #[error("request failed (HTTP {status}): {message}")]
    Status { status: u16, message: String, body: Value },
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    #[error("request failed: {0}")]
    Unknown(#[source] reqwest::Error),
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Status { .. } => ErrorKind::OtherHttp,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Decode(_) | Self::ClientBuild(_) | Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// HTTP status, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            _ => None,
        }
    }

    /// Text for the toast shown to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { .. } => SERVER_ERROR_MESSAGE.to_owned(),
            Self::Unauthorized { .. } => UNAUTHORIZED_MESSAGE.to_owned(),
            Self::Forbidden { .. } => FORBIDDEN_MESSAGE.to_owned(),
            Self::Status { message, .. } => message.clone(),
            Self::Timeout(_) => TIMEOUT_MESSAGE.to_owned(),
            Self::Network(_) | Self::Decode(_) | Self::ClientBuild(_) | Self::Unknown(_) => {
                NETWORK_ERROR_MESSAGE.to_owned()
            }
        }
    }
}

/// Classify a non-success HTTP response.
#[must_use]
pub fn classify_status(status: u16, body: Value) -> ApiError {
    match status {
        401 => ApiError::Unauthorized { body },
        403 => ApiError::Forbidden { body },
        s if s >= 500 => ApiError::Server { status: s, body },
        s => {
            let message = backend_message(&body).unwrap_or_else(|| format!("Request failed ({s})"));
            ApiError::Status { status: s, message, body }
        }
    }
}

/// Classify a failure where no usable response arrived.
#[must_use]
pub fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err)
    } else if err.is_connect() || err.is_request() {
        ApiError::Network(err)
    } else {
        ApiError::Unknown(err)
    }
}

/// First non-empty of `message`, `error`, `msg` in an error body.
fn backend_message(body: &Value) -> Option<String> {
    ["message", "error", "msg"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
