use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

const NON_NUMERIC: &[&str] = &["abc", "test123", "!@#$", "null", "undefined", "true"];

/// NO_STRING: numeric parameters must reject non-numeric text.
pub struct NoStringRule;

impl ValidationRule for NoStringRule {
    fn id(&self) -> RuleId {
        RuleId::NoString
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.schema.is_numeric()
    }

    fn generate(&self, _schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        NON_NUMERIC.iter().map(|s| ProbeValue::text(*s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaType;
    use crate::rules::builtin::test_support::param;

    #[test]
    fn applies_to_integer_and_number() {
        for t in [SchemaType::Integer, SchemaType::Number] {
            assert!(NoStringRule.applies_to(&param("n", false, Schema::of_type(t))));
        }
        assert!(!NoStringRule.applies_to(&param("s", false, Schema::of_type(SchemaType::String))));
    }

    #[test]
    fn starts_with_abc() {
        let values = NoStringRule.generate(&Schema::default(), &GenerationContext::default());
        assert_eq!(values.len(), 6);
        assert_eq!(values[0], ProbeValue::text("abc"));
    }
}
