//! Scrape pipeline: decode -> rules -> reducer -> render.

use bytes::Bytes;

use promsieve_core::error::{ParseError, Result};
use promsieve_core::exposition::{decode_exposition, render_exposition, Exposition};

use crate::policy::RuleEngine;
use crate::reduce::ResolutionStore;

/// Per-scrape sample accounting.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: u64,
    pub dropped: u64,
    /// Kept by the rules but suppressed by the resolution window.
    pub reduced: u64,
}

/// Filtered scrape result.
#[derive(Debug)]
pub struct Filtered {
    pub body: String,
    pub stats: FilterStats,
    /// Malformed upstream lines that were skipped.
    pub parse_errors: Vec<ParseError>,
}

/// Apply rules and resolution thinning in place. Samples without a
/// timestamp are treated as observed at `now_ms`.
pub fn filter_exposition(
    expo: &mut Exposition,
    engine: &RuleEngine,
    store: &ResolutionStore,
    now_ms: i64,
) -> FilterStats {
    let mut stats = FilterStats::default();
    expo.retain_samples(|sample| {
        let decision = engine.evaluate(sample);
        if decision.is_drop() {
            stats.dropped += 1;
            return false;
        }
        if let Some(resolution) = decision.resolution {
            let ts = sample.timestamp_ms.unwrap_or(now_ms);
            if !store.admit(sample.series_id(), ts, resolution) {
                stats.reduced += 1;
                return false;
            }
        }
        stats.kept += 1;
        true
    });
    stats
}

/// Run a fetched upstream body through the whole pipeline.
pub fn run_pipeline(
    body: Bytes,
    engine: &RuleEngine,
    store: &ResolutionStore,
    now_ms: i64,
) -> Result<Filtered> {
    let decoded = decode_exposition(body)?;
    let mut expo = decoded.exposition;
    let stats = filter_exposition(&mut expo, engine, store, now_ms);
    let body = render_exposition(&expo)?;
    Ok(Filtered {
        body,
        stats,
        parse_errors: decoded.errors,
    })
}
