use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

const MALFORMED_PHONES: &[&str] = &[
    "123",
    "12345",
    "abc-def-ghij",
    "123 456 789",
    "123-456-789!",
    "123@456#789",
    "<script>alert()</script>",
    "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
];

/// PHONE_CHECK: phone-number strings must reject malformed numbers.
///
/// Matches `format: phone` or any parameter whose name contains "phone".
pub struct PhoneRule;

impl ValidationRule for PhoneRule {
    fn id(&self) -> RuleId {
        RuleId::PhoneCheck
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.schema.is_string()
            && (parameter.schema.has_format("phone")
                || parameter.name.to_lowercase().contains("phone"))
    }

    fn generate(&self, _schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        MALFORMED_PHONES.iter().map(|s| ProbeValue::text(*s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaType;
    use crate::rules::builtin::test_support::param;

    #[test]
    fn matches_name_case_insensitively() {
        let schema = Schema::of_type(SchemaType::String);
        assert!(PhoneRule.applies_to(&param("mobilePhone", false, schema.clone())));
        assert!(PhoneRule.applies_to(&param("PHONE", false, schema.clone())));
        assert!(!PhoneRule.applies_to(&param("name", false, schema)));
    }

    #[test]
    fn matches_phone_format() {
        let schema = Schema {
            format: Some("phone".into()),
            ..Schema::of_type(SchemaType::String)
        };
        assert!(PhoneRule.applies_to(&param("contact", false, schema)));
    }

    #[test]
    fn eight_probes_ending_with_fifty_chars() {
        let values = PhoneRule.generate(&Schema::default(), &GenerationContext::default());
        assert_eq!(values.len(), 8);
        assert_eq!(values[7].as_param_text().map(|s| s.len()), Some(50));
    }
}
