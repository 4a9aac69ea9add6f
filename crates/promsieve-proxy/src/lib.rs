//! promsieve proxy library entry.
//!
//! This crate wires config, the label filter policy, the resolution reducer,
//! the upstream client and the axum listeners into the filtering proxy. It is
//! intended to be consumed by the binary (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod pipeline;
pub mod policy;
pub mod reduce;
pub mod router;
pub mod scrape;
pub mod server;
pub mod upstream;
