use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

/// Assumed `maxLength` when the schema declares none.
pub const DEFAULT_MAX_LENGTH: u64 = 255;
const OVERSIZED_LENGTH: usize = 10_000;
/// Longest string a probe will carry. Bounds at or above it (e.g. the
/// `2147483647` of generated schemas) are probed with strings of this length.
pub const MAX_PROBE_LENGTH: u64 = 1 << 20;

/// MAX_STRING: strings longer than `maxLength` must be rejected.
pub struct MaxStringRule;

impl ValidationRule for MaxStringRule {
    fn id(&self) -> RuleId {
        RuleId::MaxString
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        parameter.schema.is_string() && parameter.schema.max_length.is_some()
    }

    fn generate(&self, schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        let max = schema.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let over = max.saturating_add(1).min(MAX_PROBE_LENGTH);
        let doubled = max.saturating_mul(2).max(over).min(MAX_PROBE_LENGTH);
        vec![
            ProbeValue::text(filler(over)),
            ProbeValue::text(filler(doubled)),
            ProbeValue::text("a".repeat(OVERSIZED_LENGTH)),
        ]
    }
}

fn filler(len: u64) -> String {
    "a".repeat(usize::try_from(len).unwrap_or(usize::MAX).min(MAX_PROBE_LENGTH as usize))
}
