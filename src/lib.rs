#![deny(missing_docs)]
//! # inventario: umbrella crate
//!
//! A single import surface for the Inventario invocation engine.
//! Re-exports the member crates behind feature flags, plus a `prelude`
//! for the happy path: build a call, invoke it, read the outcome.
//!
//! | Feature  | Pulls in                                              |
//! |----------|-------------------------------------------------------|
//! | `core`   | `inventario-types`, `inventario-envelope`             |
//! | `client` | `inventario-client` (transport, probe, retry loop)    |
//! | `audit`  | `inventario-audit` (file and in-memory audit sinks)   |
//!
//! `client` and `audit` are on by default.

#[cfg(feature = "audit")]
pub use inventario_audit;
#[cfg(feature = "client")]
pub use inventario_client;
#[cfg(feature = "core")]
pub use inventario_envelope;
#[cfg(feature = "core")]
pub use inventario_types;

/// Happy-path imports for driving the service.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use inventario_types::{
        ArgValue, AuditSink, CallFailure, CallSuccess, Credentials, DurationMs, FieldKind,
        FieldSpec, InvocationOutcome, InvokeError, OperationCall, Transport,
    };

    #[cfg(feature = "core")]
    pub use inventario_envelope::{Extractor, classify, decode_response};

    #[cfg(feature = "client")]
    pub use inventario_client::{
        ClientConfig, Invoker, RetryPolicy, SoapTransport, is_reachable, ops,
    };

    #[cfg(feature = "audit")]
    pub use inventario_audit::{FileAuditLog, MemorySink};
}
