//! The rotating file audit log.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use inventario_types::{AuditSink, DurationMs, OutcomeSummary};
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Argument strings longer than this are cut in the rendered line.
const MAX_TEXT: usize = 120;

/// Line-oriented audit file: `[timestamp] [LEVEL] message`, one line per
/// record, appends serialized through a single writer task.
///
/// When the file would grow past its ceiling it is truncated and restarted
/// with a single reset-marker line, so the trail never eats a disk. Open
/// one log per path; two logs on the same file will interleave.
///
/// # Examples
///
/// ```no_run
/// use inventario_audit::FileAuditLog;
///
/// # async fn demo() -> std::io::Result<()> {
/// let log = FileAuditLog::create("invocations.log").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

#[derive(Debug)]
enum WriterMessage {
    Line(String),
    Flush(oneshot::Sender<()>),
}

impl FileAuditLog {
    /// Default size ceiling: 5 MiB.
    pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

    /// Open (or create) the audit file with the default size ceiling.
    ///
    /// Opening eagerly surfaces a bad path to the caller; everything after
    /// this point is swallowed-and-logged instead.
    pub async fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::with_max_bytes(path, Self::DEFAULT_MAX_BYTES).await
    }

    /// Open (or create) the audit file with an explicit size ceiling.
    pub async fn with_max_bytes(path: impl Into<PathBuf>, max_bytes: u64) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let written = file.metadata().await?.len();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(file, path, max_bytes, written, rx));
        Ok(Self { tx })
    }

    /// Wait until every record sent so far has reached the file.
    ///
    /// Appends are fire-and-forget; tests and shutdown paths call this to
    /// make the file's contents deterministic.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(WriterMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, line: String) {
        // One record, one line.
        let line = line.replace(['\n', '\r'], " ");
        if self.tx.send(WriterMessage::Line(line)).is_err() {
            warn!("audit writer task is gone; record dropped");
        }
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record_attempt(&self, operation: &str, args: &serde_json::Value, attempt: u32) {
        self.send(format!(
            "[{}] [INFO] {operation} attempt {attempt} args={}",
            timestamp(),
            bounded_json(args)
        ));
    }

    async fn record_outcome(
        &self,
        operation: &str,
        summary: &OutcomeSummary,
        elapsed: DurationMs,
    ) {
        let line = match summary {
            OutcomeSummary::Success { recovered: false } => format!(
                "[{}] [INFO] {operation} succeeded in {elapsed}",
                timestamp()
            ),
            OutcomeSummary::Success { recovered: true } => format!(
                "[{}] [INFO] {operation} succeeded after raw-response recovery in {elapsed}",
                timestamp()
            ),
            OutcomeSummary::Retrying { error } => format!(
                "[{}] [WARN] {operation} attempt failed after {elapsed}, retrying: {error}",
                timestamp()
            ),
            OutcomeSummary::Failed {
                error,
                was_truncated,
            } => {
                let note = if *was_truncated {
                    " (response arrived truncated)"
                } else {
                    ""
                };
                format!(
                    "[{}] [ERROR] {operation} failed after {elapsed}: {error}{note}",
                    timestamp()
                )
            }
        };
        self.send(line);
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Compact JSON with long strings cut down to a preview plus byte count.
fn bounded_json(value: &serde_json::Value) -> String {
    serde_json::to_string(&bounded(value)).unwrap_or_else(|_| "<unrenderable>".into())
}

fn bounded(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::String(s) if s.chars().count() > MAX_TEXT => {
            let head: String = s.chars().take(MAX_TEXT).collect();
            Value::String(format!("{head}… ({} bytes total)", s.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(bounded).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), bounded(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

async fn run_writer(
    mut file: File,
    path: PathBuf,
    max_bytes: u64,
    mut written: u64,
    mut rx: mpsc::UnboundedReceiver<WriterMessage>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMessage::Line(line) => {
                let needed = line.len() as u64 + 1;
                if written + needed > max_bytes {
                    match File::create(&path).await {
                        Ok(fresh) => {
                            file = fresh;
                            written = 0;
                            let marker = format!(
                                "[{}] [INFO] audit log reset after reaching {max_bytes} bytes",
                                timestamp()
                            );
                            written += append(&mut file, &marker).await;
                        }
                        Err(e) => warn!(error = %e, "audit log reset failed"),
                    }
                }
                written += append(&mut file, &line).await;
            }
            WriterMessage::Flush(reply) => {
                if let Err(e) = file.flush().await {
                    warn!(error = %e, "audit flush failed");
                }
                let _ = reply.send(());
            }
        }
    }
}

/// Append one line; returns the bytes that made it to the file.
async fn append(file: &mut File, line: &str) -> u64 {
    let write = async {
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    };
    match write.await {
        Ok(()) => line.len() as u64 + 1,
        Err(e) => {
            warn!(error = %e, "audit write failed; record dropped");
            0
        }
    }
}
