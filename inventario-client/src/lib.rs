//! Retrying SOAP invoker for the Inventario service.
//!
//! | Module      | Provides                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`config`]  | Endpoint, credential, and retry policy settings            |
//! | [`transport`] | [`SoapTransport`], the reqwest-backed dispatch            |
//! | [`probe`]   | Pre-flight reachability check                              |
//! | [`invoker`] | [`Invoker`], the retry loop with raw-response recovery     |
//! | [`ops`]     | Typed builders and views for the four service operations   |
//!
//! The invoker drives any [`Transport`](inventario_types::Transport), so tests
//! substitute scripted fakes and production uses [`SoapTransport`].

#![deny(missing_docs)]

pub mod config;
pub mod invoker;
pub mod ops;
pub mod probe;
pub mod transport;

pub use config::{ClientConfig, RetryPolicy};
pub use invoker::Invoker;
pub use ops::{Article, NewArticle, OperationReply, StockUpdate};
pub use probe::is_reachable;
pub use transport::SoapTransport;
