//! The Transport seam: how a request envelope reaches the service.

use crate::call::{Credentials, OperationCall};
use crate::error::TransportError;
use async_trait::async_trait;

/// An HTTP exchange that produced a response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text. May be empty, damaged, or not XML.
    pub body: String,
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request envelope to the service and brings back whatever it
/// answered.
///
/// Implementations own the HTTP exchange and nothing else: no decoding,
/// no retry decisions, no verdicts about the body. An error status is a
/// response like any other (its body may still be salvageable), so it
/// comes back as `Ok(RawResponse)`. Only a failure to complete the
/// exchange at all is an `Err`.
///
/// The caller owns the time budget; implementations must not impose their
/// own request timeouts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST one request envelope, optionally authenticated.
    async fn dispatch(
        &self,
        call: &OperationCall,
        credentials: Option<&Credentials>,
    ) -> Result<RawResponse, TransportError>;
}
