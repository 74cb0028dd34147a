use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Category of an upstream failure. Retry and HTTP status mapping branch on this
/// tag only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotFound,
    ClientError,
    ServerError,
    TransportError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ClassifiedError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            status: Some(StatusCode::NOT_FOUND.as_u16()),
            message: message.into(),
        }
    }

    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ClientError,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ServerError,
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::TransportError,
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Upstream faults may clear up on their own; caller faults and absent
    /// resources never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::ServerError | ErrorKind::TransportError)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

fn body_or_reason(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Maps a non-success upstream response to its error category.
///
/// `key` is the lookup key of the request (usually an id) and is carried in the
/// `NotFound` message. Statuses outside 4xx/5xx that still reach this point
/// (unfollowed redirects, informational codes) are treated as upstream faults.
pub fn classify(status: StatusCode, body: &str, key: &str) -> ClassifiedError {
    let code = status.as_u16();
    match code {
        404 => ClassifiedError::not_found(format!("Resource not found for the ID: {}", key)),
        400..=499 => ClassifiedError::client(code, body_or_reason(status, body)),
        500..=599 => ClassifiedError::server(
            Some(code),
            format!("upstream failure: {}", body_or_reason(status, body)),
        ),
        _ => ClassifiedError::server(
            Some(code),
            format!("upstream failure: unexpected status {}", status),
        ),
    }
}

/// No response was obtained at all: refused connection, DNS failure, timeout,
/// or a body cut off mid-read.
pub fn classify_transport(upstream: &str, error: &reqwest::Error) -> ClassifiedError {
    if error.is_timeout() {
        ClassifiedError::transport(format!("{} timed out: {}", upstream, error))
    } else {
        ClassifiedError::transport(format!("{} unreachable: {}", upstream, error))
    }
}
