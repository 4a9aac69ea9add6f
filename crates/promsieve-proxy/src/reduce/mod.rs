//! Resolution reducer.
//!
//! Thins kept series that carry a resolution constraint to at most one
//! sample per window. State lives in an injectable [`ResolutionStore`]
//! owned by each endpoint and survives across scrapes.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

pub use store::ResolutionStore;

/// Background eviction of stale series.
pub fn spawn_sweeper(
    proxy: String,
    store: Arc<ResolutionStore>,
    staleness: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick fires immediately
        tick.tick().await;
        loop {
            tick.tick().await;
            let evicted = store.evict_stale(staleness);
            if evicted > 0 {
                tracing::debug!(proxy = %proxy, evicted, remaining = store.len(), "evicted stale resolution state");
            }
        }
    })
}
