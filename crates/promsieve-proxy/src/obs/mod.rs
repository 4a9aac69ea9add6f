//! Lightweight in-process self-metrics.
//!
//! Stored as atomics behind `DashMap` label maps and rendered by the
//! self-metrics `/metrics` handler.

pub mod metrics;

pub use metrics::ProxyMetrics;
