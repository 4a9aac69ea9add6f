//! Metrics exposition model (text format 0.0.4).
//!
//! An upstream payload decodes into an [`Exposition`]: metric families in
//! source order, each carrying its HELP/TYPE metadata and its samples in
//! source order. Filtering happens by retaining samples; families that end
//! up empty are skipped by the renderer so their metadata disappears too.

pub mod parse;
pub mod render;

pub use parse::{decode_exposition, Decoded};
pub use render::{escape_label, render_exposition};

/// Pseudo-label resolving to the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// One exposition sample line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    /// Labels in source order. Names are unique.
    pub labels: Vec<(String, String)>,
    pub value: f64,
    /// Milliseconds since the Unix epoch, when the upstream supplied one.
    pub timestamp_ms: Option<i64>,
}

impl Sample {
    /// Look up a label value. `__name__` resolves to the metric name.
    pub fn label(&self, name: &str) -> Option<&str> {
        if name == METRIC_NAME_LABEL {
            return Some(&self.name);
        }
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Order-independent identity of the series this sample belongs to.
    pub fn series_id(&self) -> SeriesId {
        SeriesId::new(self.name.clone(), self.labels.clone())
    }
}

/// Metric name plus label set, compared independently of label order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId {
    name: String,
    labels: Vec<(String, String)>,
}

impl SeriesId {
    pub fn new(name: impl Into<String>, mut labels: Vec<(String, String)>) -> Self {
        labels.sort();
        Self {
            name: name.into(),
            labels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels sorted by name.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }
}

/// A metric family: shared metadata plus the samples that belong to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricFamily {
    pub name: String,
    /// Raw HELP text, still escaped as it appeared upstream.
    pub help: Option<String>,
    /// TYPE keyword (`counter`, `gauge`, `histogram`, ...).
    pub kind: Option<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sample name suffixes that belong to a family of this TYPE.
    fn suffixes(&self) -> &'static [&'static str] {
        match self.kind.as_deref() {
            Some("histogram") => &["_bucket", "_sum", "_count", "_created"],
            Some("gaugehistogram") => &["_bucket", "_gcount", "_gsum"],
            Some("summary") => &["_sum", "_count", "_created"],
            Some("counter") => &["_total", "_created"],
            Some("info") => &["_info"],
            _ => &[],
        }
    }

    /// Whether a sample named `sample_name` belongs to this family.
    ///
    /// Untyped and gauge families only own their exact name.
    pub fn owns(&self, sample_name: &str) -> bool {
        match sample_name.strip_prefix(self.name.as_str()) {
            Some("") => true,
            Some(rest) => self.suffixes().contains(&rest),
            None => false,
        }
    }
}

/// Decoded upstream payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Exposition {
    pub families: Vec<MetricFamily>,
}

impl Exposition {
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }

    /// Iterate all samples in source order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.families.iter().flat_map(|f| f.samples.iter())
    }

    /// Keep only the samples for which `keep` returns true, in source order.
    pub fn retain_samples<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Sample) -> bool,
    {
        for family in &mut self.families {
            family.samples.retain(|s| keep(s));
        }
    }
}
