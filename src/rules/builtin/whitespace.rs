use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

const WHITESPACE: &[&str] = &[" ", "   ", "\t", "\n", "\r\n", "  \t \n  "];

/// WHITESPACE: string parameters should not accept whitespace-only values.
pub struct WhitespaceRule;

impl ValidationRule for WhitespaceRule {
    fn id(&self) -> RuleId {
        RuleId::Whitespace
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.schema.is_string()
    }

    fn generate(&self, _schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        WHITESPACE.iter().map(|s| ProbeValue::text(*s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_probe_is_blank() {
        let values = WhitespaceRule.generate(&Schema::default(), &GenerationContext::default());
        assert_eq!(values.len(), 6);
        assert!(values
            .iter()
            .all(|v| v.as_param_text().is_some_and(|s| s.trim().is_empty())));
    }
}
