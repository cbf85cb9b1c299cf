//! External provider clients
//!
//! **[REC-INT-010]** Typed clients for the model and venue-verification
//! providers, plus the shared error taxonomy the retry logic branches on.

pub mod model;
pub mod places;

pub use model::{HttpModelClient, ModelProvider, ModelRequest, ModelResponse};
pub use places::{HttpPlacesClient, PlacesProvider};

use std::time::Duration;
use thiserror::Error;

/// Provider call errors
///
/// The retryable/terminal split drives every retry decision in the
/// pipeline: `RateLimited`, `Timeout`, `Unavailable`, and `Network` are
/// retried within a bounded budget; `Rejected` (4xx) and `Validation`
/// (schema-violating output) are never retried blindly.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider signaled throttling; optional resume hint
    #[error("Rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    /// The call's own timeout elapsed
    #[error("Provider request timed out")]
    Timeout,

    /// 5xx-class provider failure
    #[error("Provider unavailable (status {status})")]
    Unavailable { status: u16 },

    /// 4xx-class rejection; never retried
    #[error("Provider rejected request (status {status})")]
    Rejected { status: u16 },

    /// Malformed or schema-violating provider output
    #[error("Invalid provider response: {0}")]
    Validation(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a retry with backoff can reasonably help
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::Timeout
                | ProviderError::Unavailable { .. }
                | ProviderError::Network(_)
        )
    }
}

/// Exponential backoff delay for the given zero-based attempt
pub fn backoff_delay(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let exp = attempt.min(16);
    let delay = base_ms.saturating_mul(1u64 << exp);
    Duration::from_millis(delay.min(cap_ms))
}

/// Map a reqwest transport error into the provider taxonomy
pub(crate) fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map a non-success HTTP status into the provider taxonomy
pub(crate) fn map_status(status: u16, retry_after: Option<Duration>) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after },
        500..=599 => ProviderError::Unavailable { status },
        _ => ProviderError::Rejected { status },
    }
}

/// Parse a Retry-After response header (seconds form only)
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
