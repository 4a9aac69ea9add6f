//! Self-metrics registry for the proxy.
//!
//! Counter/gauge/histogram types with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in microseconds to avoid floating
//! point math. These series are served as-is, never through the label filters.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use promsieve_core::exposition::escape_label;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{labels}}}")
    }
}

/// Sorted snapshot so output order is stable across renders.
fn sorted<V, T, F>(map: &DashMap<LabelKey, V>, read: F) -> Vec<(LabelKey, T)>
where
    F: Fn(&V) -> T,
{
    let mut rows: Vec<(LabelKey, T)> = map.iter().map(|r| (r.key().clone(), read(r.value()))).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value, 0 if never touched.
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        for (key, val) in sorted(&self.map, |c| c.load(Ordering::Relaxed)) {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&key)), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} gauge");
        for (key, val) in sorted(&self.map, |g| g.load(Ordering::Relaxed)) {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&key)), val);
        }
    }
}

// Fixed buckets in microseconds: 1ms .. 30s. Scrapes are dominated by the
// upstream round trip.
const BUCKETS_MICROS: [u64; 9] = [
    1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000, 5_000_000, 30_000_000,
];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets (microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Render with integer microsecond `le` bounds.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        let rows = sorted(&self.map, |h| {
            let buckets: Vec<u64> = h.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect();
            (
                buckets,
                h.sum.load(Ordering::Relaxed),
                h.count.load(Ordering::Relaxed),
            )
        });
        for (key, (buckets, sum, count)) in rows {
            let labels = label_str(&key);
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{labels},")
            };
            for (le, n) in BUCKETS_MICROS.iter().zip(buckets) {
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {n}");
            }
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), &labels), sum);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), &labels), count);
        }
    }
}

#[derive(Default)]
pub struct ProxyMetrics {
    pub scrapes: CounterVec,
    pub upstream_failures: CounterVec,
    pub samples: CounterVec,
    pub parse_errors: CounterVec,
    pub serialization_errors: CounterVec,
    pub scrape_duration: HistogramVec, // In Microseconds
    pub resolution_series: GaugeVec,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render all registered metrics in exposition text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.scrapes.render(
            "promsieve_scrapes_total",
            "Scrape requests served, by response status.",
            &mut out,
        );
        self.upstream_failures.render(
            "promsieve_upstream_failures_total",
            "Failed upstream fetches, by reason.",
            &mut out,
        );
        self.samples.render(
            "promsieve_samples_total",
            "Upstream samples by filter outcome (kept, dropped, reduced).",
            &mut out,
        );
        self.parse_errors.render(
            "promsieve_parse_errors_total",
            "Malformed upstream lines skipped.",
            &mut out,
        );
        self.serialization_errors.render(
            "promsieve_serialization_errors_total",
            "Filtered expositions that failed to render.",
            &mut out,
        );
        self.scrape_duration.render(
            "promsieve_scrape_duration_micros",
            "End-to-end scrape latency in microseconds.",
            &mut out,
        );
        self.resolution_series.render(
            "promsieve_resolution_series",
            "Series currently tracked by the resolution reducer.",
            &mut out,
        );
        out
    }
}
