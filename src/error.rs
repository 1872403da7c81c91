use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RugpullError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub use crate::Result;

/// Classification of a failed call to one of the remote services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    NotFound,
    RateLimited,
    AuthenticationFailed,
    ConnectionFailed,
    Timeout,
    ParseFailure,
    UpstreamError,
}

impl UpstreamErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::AuthenticationFailed => "authentication_failed",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::ParseFailure => "parse_failure",
            Self::UpstreamError => "upstream_error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{service} {}: {message}", .kind.as_str())]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub service: &'static str,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, service: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            service,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RugpullError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_display_names_service_and_kind() {
        let err = UpstreamError::new(UpstreamErrorKind::RateLimited, "solsniffer", "slow down");
        assert_eq!(err.to_string(), "solsniffer rate_limited: slow down");

        let wrapped: RugpullError = err.into();
        assert!(matches!(
            wrapped,
            RugpullError::Upstream(UpstreamError {
                kind: UpstreamErrorKind::RateLimited,
                ..
            })
        ));
        assert!(format!("{wrapped}").contains("slow down"));
    }

    #[test]
    fn config_error_display() {
        let err = RugpullError::Config("x".to_string());
        assert!(format!("{err}").contains("configuration error"));
    }
}
