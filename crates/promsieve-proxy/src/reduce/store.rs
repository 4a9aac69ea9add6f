use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use promsieve_core::exposition::SeriesId;

#[derive(Debug, Clone, Copy)]
struct SeriesSlot {
    /// Timestamp (ms) of the last sample we let through.
    last_emitted_ms: i64,
    /// When this series was last offered, emitted or not. Drives eviction only.
    last_seen: Instant,
}

/// Per-series resolution state:
/// - `series -> last emitted timestamp`
///
/// Each admit is a single entry-API read-modify-write, so it only holds the
/// shard lock of the series involved.
#[derive(Debug, Default)]
pub struct ResolutionStore {
    slots: DashMap<SeriesId, SeriesSlot>,
}

impl ResolutionStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Decide whether a sample at `ts_ms` may be emitted under `resolution`.
    pub fn admit(&self, series: SeriesId, ts_ms: i64, resolution: Duration) -> bool {
        self.admit_at(series, ts_ms, resolution, Instant::now())
    }

    /// Like [`admit`](Self::admit) with an explicit observation instant.
    pub fn admit_at(&self, series: SeriesId, ts_ms: i64, resolution: Duration, now: Instant) -> bool {
        let resolution_ms = i64::try_from(resolution.as_millis()).unwrap_or(i64::MAX);
        match self.slots.entry(series) {
            Entry::Vacant(v) => {
                v.insert(SeriesSlot {
                    last_emitted_ms: ts_ms,
                    last_seen: now,
                });
                true
            }
            Entry::Occupied(mut o) => {
                let slot = o.get_mut();
                slot.last_seen = now;
                if ts_ms.saturating_sub(slot.last_emitted_ms) >= resolution_ms {
                    slot.last_emitted_ms = ts_ms;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn last_emitted(&self, series: &SeriesId) -> Option<i64> {
        self.slots.get(series).map(|s| s.last_emitted_ms)
    }

    /// Forget series not offered for `staleness`. Returns how many were dropped.
    ///
    /// A forgotten series behaves exactly like one never seen, so its next
    /// sample is emitted.
    pub fn evict_stale(&self, staleness: Duration) -> usize {
        self.evict_stale_at(Instant::now(), staleness)
    }

    pub fn evict_stale_at(&self, now: Instant, staleness: Duration) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| now.saturating_duration_since(slot.last_seen) < staleness);
        before.saturating_sub(self.slots.len())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
