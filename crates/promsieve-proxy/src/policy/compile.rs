//! Label filter compilation.
//!
//! Turns the `label_filters` config entries into immutable matchers once at
//! startup. Patterns are fully anchored, so `node_cpu.*` matches
//! `node_cpu_seconds_total` but not `xnode_cpu`.

use std::borrow::Cow;
use std::time::Duration;

use regex::Regex;

use promsieve_core::error::{Result, SieveError};
use promsieve_core::exposition::{Sample, METRIC_NAME_LABEL};

use crate::config::{parse_duration, ActionSpec, LabelFilter};

/// Joins source label values into the match-string.
pub const SEPARATOR: &str = ";";

/// Compiled pattern. Only answers "does this string match".
#[derive(Debug, Clone)]
pub struct Matcher(Regex);

impl Matcher {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(Self)
    }

    pub fn matches(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Drop,
    Keep,
    ReduceTimeResolution(Duration),
}

/// One compiled `label_filters` entry.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    matcher: Matcher,
    source_labels: Vec<String>,
    actions: Vec<Action>,
}

impl CompiledRule {
    pub fn new(matcher: Matcher, source_labels: Vec<String>, actions: Vec<Action>) -> Self {
        Self {
            matcher,
            source_labels,
            actions,
        }
    }

    /// Source label values joined by `;`, absent labels as empty strings.
    pub fn match_string<'a>(&self, sample: &'a Sample) -> Cow<'a, str> {
        match self.source_labels.as_slice() {
            [single] => Cow::Borrowed(sample.label(single).unwrap_or("")),
            many => Cow::Owned(
                many.iter()
                    .map(|l| sample.label(l).unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(SEPARATOR),
            ),
        }
    }

    pub fn matches(&self, sample: &Sample) -> bool {
        self.matcher.matches(&self.match_string(sample))
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Compile the filters of `proxies[proxy]`, preserving order.
pub fn compile_rules(proxy: usize, raw: &[LabelFilter]) -> Result<Vec<CompiledRule>> {
    let mut out = Vec::with_capacity(raw.len());
    for (rule, f) in raw.iter().enumerate() {
        let invalid = |field: String, reason: String| SieveError::InvalidRule {
            proxy,
            rule,
            field,
            reason,
        };

        let matcher = Matcher::new(&f.regex)
            .map_err(|e| invalid("regex".into(), format!("invalid regex: {e}")))?;

        let source_labels = match &f.source_labels {
            None => vec![METRIC_NAME_LABEL.to_string()],
            Some(labels) if labels.is_empty() => {
                return Err(invalid("source_labels".into(), "must not be empty".into()));
            }
            Some(labels) => {
                if let Some(j) = labels.iter().position(|l| l.trim().is_empty()) {
                    return Err(invalid(
                        format!("source_labels[{j}]"),
                        "label name must not be empty".into(),
                    ));
                }
                labels.clone()
            }
        };

        if f.actions.is_empty() {
            return Err(invalid("actions".into(), "must not be empty".into()));
        }
        let mut actions = Vec::with_capacity(f.actions.len());
        for (j, a) in f.actions.iter().enumerate() {
            let action = match a {
                ActionSpec::Named(name) => match name.as_str() {
                    "drop" => Action::Drop,
                    "keep" => Action::Keep,
                    "reduce_time_resolution" => {
                        return Err(invalid(
                            format!("actions[{j}]"),
                            "reduce_time_resolution requires a resolution".into(),
                        ));
                    }
                    other => {
                        return Err(invalid(
                            format!("actions[{j}]"),
                            format!("unknown action {other:?}"),
                        ));
                    }
                },
                ActionSpec::Reduce(reduce) => {
                    let field = || format!("actions[{j}].reduce_time_resolution.resolution");
                    let d = parse_duration(&reduce.reduce_time_resolution.resolution)
                        .map_err(|e| invalid(field(), e))?;
                    if d.is_zero() {
                        return Err(invalid(field(), "resolution must be positive".into()));
                    }
                    Action::ReduceTimeResolution(d)
                }
            };
            actions.push(action);
        }

        if actions.contains(&Action::Drop) && actions.contains(&Action::Keep) {
            return Err(invalid(
                "actions".into(),
                "drop and keep in the same rule contradict each other".into(),
            ));
        }

        out.push(CompiledRule::new(matcher, source_labels, actions));
    }
    Ok(out)
}
