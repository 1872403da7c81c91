pub mod openai;
pub mod solsniffer;

use reqwest::StatusCode;

use crate::error::{UpstreamError, UpstreamErrorKind};

pub use openai::ChatCompletionsGateway;
pub use solsniffer::SolSnifferGateway;

/// Maps a non-success HTTP status to an error kind. `NotFound` is only
/// meaningful for lookups, so callers opt in to it.
pub(crate) fn classify_status(status: StatusCode, not_found_is_lookup_miss: bool) -> UpstreamErrorKind {
    match status.as_u16() {
        404 if not_found_is_lookup_miss => UpstreamErrorKind::NotFound,
        429 => UpstreamErrorKind::RateLimited,
        401 | 403 => UpstreamErrorKind::AuthenticationFailed,
        _ => UpstreamErrorKind::UpstreamError,
    }
}

pub(crate) fn classify_transport(service: &'static str, err: &reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::new(
            UpstreamErrorKind::Timeout,
            service,
            "The request timed out. Please try again.",
        )
    } else if err.is_decode() {
        UpstreamError::new(
            UpstreamErrorKind::ParseFailure,
            service,
            format!("Failed to read the response: {err}"),
        )
    } else {
        UpstreamError::new(
            UpstreamErrorKind::ConnectionFailed,
            service,
            format!("Could not connect to {service}: {err}"),
        )
    }
}

pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(500).collect()
}
