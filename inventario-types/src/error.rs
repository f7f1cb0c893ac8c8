//! Error types for the invocation engine.

use crate::duration::DurationMs;

/// Errors from one invocation attempt or from pre-dispatch validation.
///
/// Retryable variants describe a single attempt; the variant carried by a
/// terminal failure is always the one from the last attempt. `Display`
/// phrases each variant the way an operator should read it: unreachable
/// server, incomplete response, or an explicit server-side rejection.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    // Never dispatched
    /// Arguments failed client-side validation. The call is never sent
    /// and no attempt is counted.
    #[error("invalid call: {0}")]
    InvalidCall(String),
    /// The caller cancelled the invocation.
    #[error("cancelled")]
    Cancelled,

    // Retryable, one attempt each
    /// The attempt's escalating time budget elapsed with no response.
    #[error("server unreachable: no response within {limit}")]
    Timeout {
        /// The budget that elapsed.
        limit: DurationMs,
    },
    /// Connection-level failure (refused, reset, DNS).
    #[error("server unreachable: {0}")]
    Network(String),
    /// HTTP error status whose body yielded nothing salvageable.
    #[error("http status {status}")]
    Http {
        /// Status code of the failed exchange.
        status: u16,
    },
    /// The body arrived visibly incomplete.
    #[error("response incomplete")]
    Truncated,
    /// The body arrived whole but neither decoded nor recovered.
    #[error("undecodable response: {0}")]
    Decode(String),
    /// The server answered and explicitly rejected the operation.
    #[error("operation rejected by server: {message}")]
    Rejected {
        /// Server-side rejection message.
        message: String,
    },
}

impl InvokeError {
    /// Whether another attempt may change the result.
    ///
    /// Validation failures and cancellation never retry; everything the
    /// wire can do differently next time does.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Network(_)
                | Self::Http { .. }
                | Self::Truncated
                | Self::Decode(_)
                | Self::Rejected { .. }
        )
    }
}

impl From<TransportError> for InvokeError {
    /// Every failed exchange, whatever its phase, reads as an unreachable
    /// server to the caller.
    fn from(err: TransportError) -> Self {
        Self::Network(err.to_string())
    }
}

/// Errors from the HTTP exchange itself.
///
/// Anything that produced a response, whatever its status, is not an
/// error at this layer. Only failures to complete the exchange land here.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the server at all.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The request was sent but the exchange failed mid-flight.
    #[error("request failed: {0}")]
    Request(String),
    /// A response arrived but its body could not be read.
    #[error("body read failed: {0}")]
    Body(String),
}
