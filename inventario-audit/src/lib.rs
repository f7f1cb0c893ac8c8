//! # inventario-audit: audit trail backends
//!
//! Two [`AuditSink`] implementations for the invocation engine:
//!
//! - [`FileAuditLog`]: a line-oriented file with timestamped, leveled
//!   entries and a size ceiling, written by a single background task so
//!   concurrent calls never interleave within a line.
//! - [`MemorySink`]: an in-memory recorder for tests and embedders that
//!   want to inspect engine behavior programmatically.
//!
//! Sinks observe and never steer: a sink that cannot write logs the
//! problem through `tracing` and drops the record. No call ever fails
//! because its audit trail did.
//!
//! [`AuditSink`]: inventario_types::AuditSink

#![deny(missing_docs)]

pub mod file;
pub mod memory;

pub use file::FileAuditLog;
pub use memory::{AuditEvent, MemorySink};
