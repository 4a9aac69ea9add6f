#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use promsieve_core::error::SieveError;
use promsieve_core::exposition::{parse::decode_str, Sample};
use promsieve_proxy::config::LabelFilter;
use promsieve_proxy::policy::{Decision, Disposition, RuleEngine};

fn engine(yaml: &str) -> RuleEngine {
    let filters: Vec<LabelFilter> = serde_yaml::from_str(yaml).unwrap();
    RuleEngine::compile(0, &filters).unwrap()
}

fn compile_err(yaml: &str) -> SieveError {
    let filters: Vec<LabelFilter> = serde_yaml::from_str(yaml).unwrap();
    RuleEngine::compile(0, &filters).expect_err("must fail")
}

fn sample(line: &str) -> Sample {
    decode_str(line).unwrap().exposition.samples().next().cloned().unwrap()
}

const KEEP: Decision = Decision {
    disposition: Disposition::Keep,
    resolution: None,
};

#[test]
fn no_match_keeps_unmodified() {
    let e = engine(
        r#"
- regex: foo.*
  actions: [drop]
"#,
    );
    assert_eq!(e.evaluate(&sample("bar_total 1")), KEEP);
    assert_eq!(RuleEngine::default().evaluate(&sample("bar_total 1")), KEEP);
}

#[test]
fn regex_is_anchored() {
    let e = engine(
        r#"
- regex: node_cpu
  actions: [drop]
"#,
    );
    assert!(e.evaluate(&sample("node_cpu 1")).is_drop());
    assert!(!e.evaluate(&sample("node_cpu_seconds_total 1")).is_drop());
    assert!(!e.evaluate(&sample("xnode_cpu 1")).is_drop());
}

#[test]
fn last_matching_rule_wins() {
    let e = engine(
        r#"
- regex: .*
  actions: [drop]
- regex: node_.*
  actions: [keep]
- regex: node_scrape_.*
  actions: [drop]
"#,
    );
    assert!(e.evaluate(&sample("go_goroutines 12")).is_drop());
    assert!(!e.evaluate(&sample("node_load1 0.5")).is_drop());
    assert!(e.evaluate(&sample("node_scrape_collector_success 1")).is_drop());
}

#[test]
fn resolution_persists_until_overridden() {
    let e = engine(
        r#"
- regex: node_.*
  actions:
    - reduce_time_resolution: { resolution: 1m }
- regex: node_hwmon.*
  actions:
    - reduce_time_resolution: { resolution: 30s }
- regex: .*
  actions: [keep]
"#,
    );
    let hwmon = e.evaluate(&sample("node_hwmon_temp_celsius{chip=\"x\"} 42"));
    assert_eq!(hwmon.resolution, Some(Duration::from_secs(30)));
    assert_eq!(hwmon.disposition, Disposition::Keep);

    let load = e.evaluate(&sample("node_load1 1"));
    assert_eq!(load.resolution, Some(Duration::from_secs(60)));
}

#[test]
fn keep_and_reduce_in_one_rule() {
    let e = engine(
        r#"
- regex: .*
  actions: [drop]
- regex: node_cpu.*
  actions:
    - keep
    - reduce_time_resolution: { resolution: 30s }
"#,
    );
    let d = e.evaluate(&sample("node_cpu_seconds_total{cpu=\"0\",mode=\"idle\"} 5"));
    assert_eq!(
        d,
        Decision {
            disposition: Disposition::Keep,
            resolution: Some(Duration::from_secs(30)),
        }
    );
}

#[test]
fn source_labels_are_joined_with_semicolon() {
    let e = engine(
        r#"
- regex: .*
  actions: [drop]
- regex: node_filesystem_device_error|nvme.*
  actions: [keep]
- regex: node_filesystem_device_error;tmpfs
  source_labels: [__name__, fstype]
  actions: [drop]
"#,
    );
    let tmpfs = sample("node_filesystem_device_error{device=\"tmpfs\",fstype=\"tmpfs\"} 0");
    let ext4 = sample("node_filesystem_device_error{device=\"/dev/sda1\",fstype=\"ext4\"} 0");
    let other = sample("node_filesystem_avail_bytes{fstype=\"tmpfs\"} 0");
    assert!(e.evaluate(&tmpfs).is_drop());
    assert!(!e.evaluate(&ext4).is_drop());
    assert!(e.evaluate(&other).is_drop());
}

#[test]
fn absent_source_label_is_empty_string() {
    let e = engine(
        r#"
- regex: up;
  source_labels: [__name__, job]
  actions: [drop]
"#,
    );
    assert!(e.evaluate(&sample("up 1")).is_drop());
    assert!(!e.evaluate(&sample("up{job=\"a\"} 1")).is_drop());
}

#[test]
fn invalid_regex_names_rule_and_field() {
    let err = compile_err(
        r#"
- regex: ok.*
  actions: [keep]
- regex: "node_(cpu"
  actions: [keep]
"#,
    );
    match err {
        SieveError::InvalidRule { proxy, rule, field, .. } => {
            assert_eq!((proxy, rule, field.as_str()), (0, 1, "regex"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_rules_rejected() {
    let cases = [
        ("- regex: a\n  actions: []\n", "actions"),
        ("- regex: a\n  actions: [explode]\n", "actions[0]"),
        ("- regex: a\n  actions: [reduce_time_resolution]\n", "actions[0]"),
        (
            "- regex: a\n  actions:\n    - reduce_time_resolution: { resolution: 0s }\n",
            "actions[0].reduce_time_resolution.resolution",
        ),
        (
            "- regex: a\n  actions:\n    - keep\n    - reduce_time_resolution: { resolution: soon }\n",
            "actions[1].reduce_time_resolution.resolution",
        ),
        ("- regex: a\n  actions: [drop, keep]\n", "actions"),
        ("- regex: a\n  source_labels: []\n  actions: [keep]\n", "source_labels"),
        (
            "- regex: a\n  source_labels: [__name__, \"\"]\n  actions: [keep]\n",
            "source_labels[1]",
        ),
    ];
    for (yaml, want) in cases {
        match compile_err(yaml) {
            SieveError::InvalidRule { rule, field, .. } => {
                assert_eq!(rule, 0, "{yaml}");
                assert_eq!(field, want, "{yaml}");
            }
            other => panic!("unexpected error for {yaml}: {other}"),
        }
    }
}
