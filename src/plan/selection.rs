use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::Endpoint;
use crate::rules::{RuleEngine, RuleId};

/// Per-rule choice: whether it runs, and optionally which parameters it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleChoice {
    pub rule: RuleId,
    pub enabled: bool,
    /// Parameter names to target. Empty means every parameter.
    #[serde(default)]
    pub params: Vec<String>,
}

/// Ordered rule selection for one endpoint. Declaration order is the order
/// rules are expanded into test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSelection {
    choices: Vec<RuleChoice>,
}

impl RuleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every rule enabled against every parameter.
    pub fn all() -> Self {
        Self::enabled(&RuleId::ALL)
    }

    /// The given rules enabled against every parameter.
    pub fn enabled(rules: &[RuleId]) -> Self {
        let mut selection = Self::new();
        for &rule in rules {
            selection.set(rule, true, Vec::new());
        }
        selection
    }

    /// The configured default rule set, against every parameter.
    pub fn defaults(config: &Config) -> Self {
        Self::enabled(&config.rules.enabled)
    }

    /// Each rule suggested for any parameter, enabled for exactly the
    /// parameters that triggered it (first-seen order).
    pub fn suggested(endpoint: &Endpoint, engine: &RuleEngine) -> Self {
        let mut selection = Self::new();
        for param in &endpoint.parameters {
            for rule in engine.suggest(param) {
                match selection.choices.iter_mut().find(|c| c.rule == rule) {
                    Some(choice) => choice.params.push(param.name.clone()),
                    None => selection.choices.push(RuleChoice {
                        rule,
                        enabled: true,
                        params: vec![param.name.clone()],
                    }),
                }
            }
        }
        selection
    }

    /// Insert or replace a choice. Replacing keeps the original position.
    pub fn set(&mut self, rule: RuleId, enabled: bool, params: Vec<String>) {
        match self.choices.iter_mut().find(|c| c.rule == rule) {
            Some(choice) => {
                choice.enabled = enabled;
                choice.params = params;
            }
            None => self.choices.push(RuleChoice {
                rule,
                enabled,
                params,
            }),
        }
    }

    /// Add the rule enabled with `params`, or flip an existing choice.
    pub fn toggle(&mut self, rule: RuleId, params: Vec<String>) {
        match self.choices.iter_mut().find(|c| c.rule == rule) {
            Some(choice) => choice.enabled = !choice.enabled,
            None => self.choices.push(RuleChoice {
                rule,
                enabled: true,
                params,
            }),
        }
    }

    pub fn choices(&self) -> &[RuleChoice] {
        &self.choices
    }

    pub fn enabled_rules(&self) -> Vec<RuleId> {
        self.choices
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.rule)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.iter().all(|c| !c.enabled)
    }
}
