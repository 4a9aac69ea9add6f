use std::time::Duration;

use promsieve_core::exposition::Sample;

use crate::config::LabelFilter;

use super::compile::{compile_rules, Action, CompiledRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Drop,
}

/// Outcome of evaluating every rule against one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub disposition: Disposition,
    /// Minimum spacing between emitted samples; `None` passes every sample.
    pub resolution: Option<Duration>,
}

impl Default for Decision {
    fn default() -> Self {
        Self {
            disposition: Disposition::Keep,
            resolution: None,
        }
    }
}

impl Decision {
    /// Fold one action into the running decision. Later actions win.
    fn apply(mut self, action: Action) -> Self {
        match action {
            Action::Drop => self.disposition = Disposition::Drop,
            Action::Keep => self.disposition = Disposition::Keep,
            Action::ReduceTimeResolution(d) => self.resolution = Some(d),
        }
        self
    }

    pub fn is_drop(&self) -> bool {
        self.disposition == Disposition::Drop
    }
}

/// Endpoint-scoped rule runtime.
/// Construct once at startup, then share via Arc.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self { rules }
    }

    pub fn compile(proxy: usize, filters: &[LabelFilter]) -> promsieve_core::Result<Self> {
        compile_rules(proxy, filters).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Left-to-right fold over matching rules; a rule's actions apply in
    /// listed order as if each were its own rule at that position.
    pub fn evaluate(&self, sample: &Sample) -> Decision {
        self.rules
            .iter()
            .filter(|r| r.matches(sample))
            .flat_map(|r| r.actions().iter().copied())
            .fold(Decision::default(), Decision::apply)
    }
}
