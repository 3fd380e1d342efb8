// Typed failures from the text-generation service.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// Unreachable, overloaded or rate limited.
    Unavailable,
    /// Missing, rejected or unauthorized credential.
    AuthError,
    Timeout,
    Unknown,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceErrorKind::Unavailable => "service unavailable",
            ServiceErrorKind::AuthError => "authentication failed",
            ServiceErrorKind::Timeout => "request timed out",
            ServiceErrorKind::Unknown => "unexpected service error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unavailable, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::AuthError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from the Messages API.
    pub fn from_status(status: u16) -> Self {
        let message = format!("API returned status {status}");
        match status {
            401 | 403 => Self::auth(message),
            408 => Self::timeout(message),
            429 | 500..=599 => Self::unavailable(message),
            _ => Self::unknown(message),
        }
    }

    /// Classify the `error.type` of an in-stream `error` event.
    pub fn from_api_error_type(error_type: &str, message: impl Into<String>) -> Self {
        match error_type {
            "authentication_error" | "permission_error" => Self::auth(message),
            "overloaded_error" | "rate_limit_error" | "api_error" => Self::unavailable(message),
            _ => Self::unknown(message),
        }
    }
}
