#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use promsieve_core::exposition::SeriesId;
use promsieve_proxy::reduce::ResolutionStore;
use tokio::time::Instant;

const RES: Duration = Duration::from_secs(30);

fn series(cpu: &str) -> SeriesId {
    SeriesId::new("node_cpu_seconds_total", vec![("cpu".into(), cpu.into())])
}

#[test]
fn same_timestamp_never_double_emits() {
    let store = ResolutionStore::new();
    assert!(store.admit(series("0"), 1_000_000, RES));
    assert!(!store.admit(series("0"), 1_000_000, RES));
    assert!(!store.admit(series("0"), 1_000_000, RES));
}

#[test]
fn exact_resolution_steps_always_emit() {
    let store = ResolutionStore::new();
    for i in 0..10 {
        assert!(store.admit(series("0"), 1_000_000 + i * 30_000, RES), "step {i}");
    }
}

#[test]
fn suppressed_sample_does_not_move_the_window() {
    let store = ResolutionStore::new();
    assert!(store.admit(series("0"), 0, RES));
    assert!(!store.admit(series("0"), 20_000, RES));
    assert_eq!(store.last_emitted(&series("0")), Some(0));
    // 30s after the last *emitted* sample, not after the suppressed one
    assert!(store.admit(series("0"), 30_000, RES));
    assert_eq!(store.last_emitted(&series("0")), Some(30_000));
}

#[test]
fn series_are_tracked_independently() {
    let store = ResolutionStore::new();
    assert!(store.admit(series("0"), 0, RES));
    assert!(store.admit(series("1"), 10_000, RES));
    assert!(!store.admit(series("0"), 10_000, RES));
    assert_eq!(store.len(), 2);
}

#[test]
fn label_order_does_not_split_identity() {
    let store = ResolutionStore::new();
    let a = SeriesId::new("m", vec![("a".into(), "1".into()), ("b".into(), "2".into())]);
    let b = SeriesId::new("m", vec![("b".into(), "2".into()), ("a".into(), "1".into())]);
    assert!(store.admit(a, 0, RES));
    assert!(!store.admit(b, 1, RES));
}

#[test]
fn stale_series_are_evicted_and_then_emit_again() {
    let store = ResolutionStore::new();
    let t0 = Instant::now();
    assert!(store.admit_at(series("0"), 0, RES, t0));
    assert!(store.admit_at(series("1"), 0, RES, t0 + Duration::from_secs(500)));

    let evicted = store.evict_stale_at(t0 + Duration::from_secs(601), Duration::from_secs(600));
    assert_eq!(evicted, 1);
    assert_eq!(store.len(), 1);
    assert!(store.last_emitted(&series("0")).is_none());

    // forgotten behaves like never seen
    assert!(store.admit(series("0"), 1_000, RES));
}

#[test]
fn concurrent_admits_for_one_series_emit_once() {
    let store = ResolutionStore::new();
    let emitted = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..100 {
                    if store.admit(series("0"), 5_000, RES) {
                        emitted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });
    assert_eq!(emitted.load(Ordering::Relaxed), 1);
}
