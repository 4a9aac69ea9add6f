//! promsieve core: exposition model, parser/renderer, and error types.
//!
//! This crate defines the data model and error surface shared by the proxy
//! and its tooling. It intentionally carries no transport or runtime
//! dependencies so the parser and renderer can be exercised in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Upstream payloads
//! are untrusted input: every malformed line must surface as a `ParseError`
//! and every whole-body failure as a `SieveError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;

/// Shared result type.
pub use error::{Result, SieveError};
