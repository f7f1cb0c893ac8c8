//! The Audit seam: every attempt and disposition flows through a sink.

use crate::duration::DurationMs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Condensed disposition of one attempt, as recorded to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeSummary {
    /// The attempt produced usable data.
    Success {
        /// `true` when the data came from tolerant recovery or an
        /// error-status exchange.
        recovered: bool,
    },
    /// The attempt failed and the engine will try again.
    Retrying {
        /// Short description of what went wrong.
        error: String,
    },
    /// The attempt failed and no retries remain.
    Failed {
        /// Short description of what went wrong.
        error: String,
        /// `true` when the final body arrived truncated.
        was_truncated: bool,
    },
}

/// Receives one record before each dispatch and one once each attempt's
/// disposition is known.
///
/// Sinks observe; they never steer. A sink that cannot write logs the
/// problem and swallows it; the engine must not fail a call because its
/// audit trail did.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// An attempt is about to be dispatched.
    ///
    /// `args` is a bounded rendering of the call arguments, safe to
    /// persist verbatim.
    async fn record_attempt(&self, operation: &str, args: &serde_json::Value, attempt: u32);

    /// An attempt's disposition is known.
    async fn record_outcome(
        &self,
        operation: &str,
        summary: &OutcomeSummary,
        elapsed: DurationMs,
    );
}

/// Discards every record. The default sink when callers want none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl AuditSink for NullSink {
    async fn record_attempt(&self, _operation: &str, _args: &serde_json::Value, _attempt: u32) {}

    async fn record_outcome(
        &self,
        _operation: &str,
        _summary: &OutcomeSummary,
        _elapsed: DurationMs,
    ) {
    }
}
