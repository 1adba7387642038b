use once_cell::sync::Lazy;

use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

static MALFORMED_EMAILS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut values: Vec<String> = [
        "plaintext",
        "@domain.com",
        "user@",
        "user @domain.com",
        "user..name@domain.com",
        "user@domain..com",
        ".user@domain.com",
        "user@domain",
        "<script>@domain.com",
        "user@<script>.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    values.push(format!("{}@domain.com", "a".repeat(255)));
    values
});

/// EMAIL_CHECK: `format: email` parameters must reject malformed addresses.
pub struct EmailRule;

impl ValidationRule for EmailRule {
    fn id(&self) -> RuleId {
        RuleId::EmailCheck
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.schema.is_string() && parameter.schema.has_format("email")
    }

    fn generate(&self, _schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        MALFORMED_EMAILS.iter().map(ProbeValue::text).collect()
    }
}
