//! Policy layer (label filter rules).
//!
//! Compiles `label_filters` configuration into ordered matchers and folds
//! them into a keep/drop decision plus an optional resolution constraint
//! for each sample.

pub mod compile;
pub mod engine;

pub use compile::{compile_rules, Action, CompiledRule, Matcher};
pub use engine::{Decision, Disposition, RuleEngine};
