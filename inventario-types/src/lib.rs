//! # inventario-types: shared model for the resilient invocation engine
//!
//! This crate defines the data model and the two seams every other crate
//! in the workspace composes around:
//!
//! | Seam | Trait | What it does |
//! |------|-------|--------------|
//! | Transport | [`Transport`] | Moves one request envelope to the service and back |
//! | Audit | [`AuditSink`] | Receives one record per attempt and one per disposition |
//!
//! ## Design Principle
//!
//! The transport seam is operation-defined, not mechanism-defined:
//! [`Transport::dispatch`] means "cause this call's envelope to reach the
//! service and bring back whatever it answered", not "run reqwest." An
//! HTTP error status is NOT a transport error: its body may still be
//! salvageable, so it comes back as an ordinary [`RawResponse`] and the
//! layers above decide what it means.
//!
//! Everything here is plain data plus the error taxonomy. Classification,
//! decoding, extraction, and the retry loop live in the `inventario-envelope`
//! and `inventario-client` crates.

#![deny(missing_docs)]

pub mod audit;
pub mod call;
pub mod duration;
pub mod error;
pub mod outcome;
pub mod transport;

pub use audit::{AuditSink, NullSink, OutcomeSummary};
pub use call::{ArgValue, Credentials, FieldKind, FieldSpec, OperationCall};
pub use duration::DurationMs;
pub use error::{InvokeError, TransportError};
pub use outcome::{
    CallFailure, CallSuccess, Completeness, ExtractionResult, InvocationOutcome, ResponseDocument,
};
pub use transport::{RawResponse, Transport};
