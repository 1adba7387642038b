//! Test-case planning: rule selection × parameters × probe values, minus
//! anything already accepted as a false positive.

pub mod selection;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Endpoint, Parameter};
use crate::rules::{GenerationContext, ProbeValue, RuleEngine, RuleId};
use crate::store::FalsePositiveMark;

pub use selection::{RuleChoice, RuleSelection};

/// One probe to send: a rule's value at a given index against one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// `{endpoint}_{rule}_{parameter}_{index}`.
    pub id: String,
    pub endpoint_id: String,
    pub rule: RuleId,
    pub parameter: Parameter,
    /// Position of `value` in the rule's generated sequence.
    pub value_index: usize,
    pub value: ProbeValue,
}

impl TestCase {
    pub fn identity(endpoint_id: &str, rule: RuleId, parameter: &str, index: usize) -> String {
        format!("{endpoint_id}_{rule}_{parameter}_{index}")
    }
}

/// Expands a rule selection into the ordered list of test cases for an
/// endpoint.
pub struct TestCaseBuilder<'a> {
    engine: &'a RuleEngine,
    ctx: GenerationContext,
}

impl<'a> TestCaseBuilder<'a> {
    pub fn new(engine: &'a RuleEngine) -> Self {
        Self {
            engine,
            ctx: GenerationContext::default(),
        }
    }

    pub fn with_context(mut self, ctx: GenerationContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Order: selection order, then endpoint parameter order, then value
    /// order. Cases whose identity is marked as a false positive for this
    /// endpoint are left out.
    pub fn build(
        &self,
        endpoint: &Endpoint,
        selection: &RuleSelection,
        false_positives: &[FalsePositiveMark],
    ) -> Vec<TestCase> {
        let suppressed: HashSet<&str> = false_positives
            .iter()
            .filter(|fp| fp.endpoint_id == endpoint.id)
            .map(|fp| fp.test_id.as_str())
            .collect();
        let tokens = parameter_tokens(&endpoint.parameters);

        let mut cases = Vec::new();
        for choice in selection.choices().iter().filter(|c| c.enabled) {
            for (param, token) in endpoint.parameters.iter().zip(&tokens) {
                if !choice.params.is_empty() && !choice.params.contains(&param.name) {
                    continue;
                }
                let values = self.engine.generate_with(choice.rule, &param.schema, &self.ctx);
                for (index, value) in values.into_iter().enumerate() {
                    let id = TestCase::identity(&endpoint.id, choice.rule, token, index);
                    if suppressed.contains(id.as_str()) {
                        debug!(test_id = %id, "skipping test marked as false positive");
                        continue;
                    }
                    cases.push(TestCase {
                        id,
                        endpoint_id: endpoint.id.clone(),
                        rule: choice.rule,
                        parameter: param.clone(),
                        value_index: index,
                        value,
                    });
                }
            }
        }
        cases
    }
}

/// The name used in test identities for each parameter. A name declared
/// more than once (e.g. `id` in path and body) is qualified with its
/// location from the second occurrence on, then with an occurrence number
/// if the qualified name is taken too.
fn parameter_tokens(parameters: &[Parameter]) -> Vec<String> {
    let mut issued: HashSet<String> = HashSet::new();
    parameters
        .iter()
        .map(|p| {
            let qualified = format!("{}:{}", p.location, p.name);
            let mut token = p.name.clone();
            if issued.contains(&token) {
                token = qualified.clone();
            }
            let mut occurrence = 2;
            while issued.contains(&token) {
                token = format!("{qualified}#{occurrence}");
                occurrence += 1;
            }
            issued.insert(token.clone());
            token
        })
        .collect()
}
