use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

/// REQUIRED_CHECK: a required parameter must reject missing or blank input.
pub struct RequiredRule;

impl ValidationRule for RequiredRule {
    fn id(&self) -> RuleId {
        RuleId::RequiredCheck
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.required
    }

    fn generate(&self, _schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        vec![
            ProbeValue::null(),
            ProbeValue::Absent,
            ProbeValue::text(""),
            ProbeValue::text("   "),
        ]
    }
}
