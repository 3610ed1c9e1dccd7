//! Transport error types

use crate::message::{ChatError, ErrorCode};
use thiserror::Error;

/// Failure of a transport call, with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Forbidden, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::RateLimit, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection dropped, DNS, timeouts
    Network,
    /// Missing or expired credentials (401)
    Unauthorized,
    /// Blocked by the provider (403)
    Forbidden,
    /// Provider demands a captcha before continuing
    Captcha,
    /// Too many requests (429)
    RateLimit,
    Unknown,
}

impl TransportErrorKind {
    pub fn error_code(self) -> ErrorCode {
        match self {
            Self::Network => ErrorCode::Network,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Forbidden => ErrorCode::Forbidden,
            Self::Captcha => ErrorCode::Captcha,
            Self::RateLimit => ErrorCode::ThrottleLimit,
            Self::Unknown => ErrorCode::Transport,
        }
    }
}

impl From<&TransportError> for ChatError {
    fn from(err: &TransportError) -> Self {
        ChatError::new(err.kind.error_code(), err.message.clone())
    }
}
