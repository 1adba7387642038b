pub mod builtin;
pub mod catalog;
pub mod policy;
pub mod value;

use crate::model::{Parameter, Schema};

pub use catalog::{RuleId, RuleMetadata, Severity};
pub use value::{GenerationContext, ProbeValue};

/// A validation rule decides whether it applies to a parameter and produces
/// the probe values to send.
///
/// `generate` must return the same fixed-length, ordered sequence for the
/// same schema and context: a value's index is part of test-case identity.
pub trait ValidationRule: Send + Sync {
    fn id(&self) -> RuleId;

    /// Whether the parameter's resolved schema makes this rule relevant.
    fn applies_to(&self, parameter: &Parameter) -> bool;

    fn generate(&self, schema: &Schema, ctx: &GenerationContext) -> Vec<ProbeValue>;

    fn metadata(&self) -> RuleMetadata {
        self.id().metadata()
    }
}

/// The rule engine holds the registered rules. It performs no I/O.
pub struct RuleEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleEngine {
    /// Create a new engine with all built-in rules registered.
    pub fn new() -> Self {
        Self {
            rules: builtin::all_rules(),
        }
    }

    /// An engine restricted to the given rules.
    pub fn with_rules(ids: &[RuleId]) -> Self {
        Self {
            rules: builtin::all_rules()
                .into_iter()
                .filter(|r| ids.contains(&r.id()))
                .collect(),
        }
    }

    fn rule(&self, id: RuleId) -> Option<&dyn ValidationRule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    /// Rules relevant to a parameter, based solely on its shape.
    pub fn suggest(&self, parameter: &Parameter) -> Vec<RuleId> {
        self.rules
            .iter()
            .filter(|r| r.applies_to(parameter))
            .map(|r| r.id())
            .collect()
    }

    /// Probe values for `rule` against `schema`, with dates relative to now.
    pub fn generate(&self, rule: RuleId, schema: &Schema) -> Vec<ProbeValue> {
        self.generate_with(rule, schema, &GenerationContext::default())
    }

    /// Probe values with an explicit generation context. A rule not
    /// registered with this engine yields no values.
    pub fn generate_with(
        &self,
        rule: RuleId,
        schema: &Schema,
        ctx: &GenerationContext,
    ) -> Vec<ProbeValue> {
        self.rule(rule)
            .map(|r| r.generate(schema, ctx))
            .unwrap_or_default()
    }

    /// Generation by rule name; unknown names yield no values.
    pub fn generate_named(&self, rule: &str, schema: &Schema) -> Vec<ProbeValue> {
        RuleId::from_str_lenient(rule)
            .map(|id| self.generate(id, schema))
            .unwrap_or_default()
    }

    /// List metadata for all registered rules.
    pub fn list_rules(&self) -> Vec<RuleMetadata> {
        self.rules.iter().map(|r| r.metadata()).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
