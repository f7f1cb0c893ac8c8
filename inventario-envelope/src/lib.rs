//! # inventario-envelope: the wire-format layer
//!
//! Everything the engine knows about SOAP 1.1 bodies lives here, as pure
//! functions of their inputs:
//!
//! | Concern | Entry point | Verdict |
//! |---------|------------|---------|
//! | Render a request | [`render_request`] | envelope text |
//! | Did the body arrive whole? | [`classify`] | [`Completeness`] |
//! | Strict decode | [`decode_response`] | [`ResponseDocument`] or [`DecodeError`] |
//! | Tolerant recovery | [`Extractor::extract`] | [`ExtractionResult`] |
//!
//! The strict decoder and the tolerant extractor are deliberately separate
//! implementations: the decoder refuses anything it cannot fully account
//! for, the extractor assumes the body is damaged and goes hunting with
//! patterns. Retry decisions on top of these verdicts belong to
//! `inventario-client`.

#![deny(missing_docs)]

pub mod classify;
pub mod decode;
pub mod escape;
pub mod extract;
pub mod request;

pub use classify::classify;
pub use decode::{DecodeError, decode_response};
pub use escape::{escape, unescape};
pub use extract::{Extractor, NO_DATA_MESSAGE};
pub use request::render_request;

// Re-export the verdict types for convenience
pub use inventario_types::{Completeness, ExtractionResult, ResponseDocument};
