//! An in-memory sink for tests and embedding callers.

use async_trait::async_trait;
use inventario_types::{AuditSink, DurationMs, OutcomeSummary};
use tokio::sync::Mutex;

/// One recorded observation, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    /// A dispatch is about to start.
    Attempt {
        /// Operation name as sent on the wire.
        operation: String,
        /// Arguments rendered to JSON.
        args: serde_json::Value,
        /// 1-based attempt number.
        attempt: u32,
    },
    /// An attempt or the whole call finished.
    Outcome {
        /// Operation name as sent on the wire.
        operation: String,
        /// What happened.
        summary: OutcomeSummary,
        /// Time spent on the attempt (or the call, for final records).
        elapsed: DurationMs,
    },
}

/// Buffers every record in memory.
///
/// Tests assert against [`events`](MemorySink::events); nothing is ever
/// evicted, so keep these short-lived.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    /// How many attempts were recorded for `operation`.
    pub async fn attempts(&self, operation: &str) -> u32 {
        self.events
            .lock()
            .await
            .iter()
            .filter(|event| matches!(event, AuditEvent::Attempt { operation: op, .. } if op == operation))
            .count() as u32
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn record_attempt(&self, operation: &str, args: &serde_json::Value, attempt: u32) {
        self.events.lock().await.push(AuditEvent::Attempt {
            operation: operation.to_owned(),
            args: args.clone(),
            attempt,
        });
    }

    async fn record_outcome(
        &self,
        operation: &str,
        summary: &OutcomeSummary,
        elapsed: DurationMs,
    ) {
        self.events.lock().await.push(AuditEvent::Outcome {
            operation: operation.to_owned(),
            summary: summary.clone(),
            elapsed,
        });
    }
}
