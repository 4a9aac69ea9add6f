//! Top-level facade crate for promsieve.
//!
//! Re-exports the exposition core and the proxy library so users can depend on a single crate.

pub mod core {
    pub use promsieve_core::*;
}

pub mod proxy {
    pub use promsieve_proxy::*;
}
