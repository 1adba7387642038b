use crate::model::{Parameter, Schema};
use crate::rules::value::{MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

/// Assumed `maximum` when the schema declares none.
pub const DEFAULT_MAXIMUM: f64 = 100.0;
/// Assumed `minimum` when the schema declares none.
pub const DEFAULT_MINIMUM: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
}

/// MIN_NUMBER / MAX_NUMBER: numbers outside the declared range must be rejected.
///
/// Probes are the bound pushed one step out, pushed far out, and the safe
/// integer extremum on that side.
pub struct NumberBoundRule {
    bound: Bound,
}

impl NumberBoundRule {
    pub fn min() -> Self {
        Self { bound: Bound::Min }
    }

    pub fn max() -> Self {
        Self { bound: Bound::Max }
    }
}

impl ValidationRule for NumberBoundRule {
    fn id(&self) -> RuleId {
        match self.bound {
            Bound::Min => RuleId::MinNumber,
            Bound::Max => RuleId::MaxNumber,
        }
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        let schema = &parameter.schema;
        schema.is_numeric()
            && match self.bound {
                Bound::Min => schema.minimum.is_some(),
                Bound::Max => schema.maximum.is_some(),
            }
    }

    fn generate(&self, schema: &Schema, _ctx: &GenerationContext) -> Vec<ProbeValue> {
        match self.bound {
            Bound::Max => {
                let max = schema.maximum.unwrap_or(DEFAULT_MAXIMUM);
                vec![
                    ProbeValue::number(max + 1.0),
                    ProbeValue::number(max * 10.0),
                    ProbeValue::integer(MAX_SAFE_INTEGER),
                ]
            }
            Bound::Min => {
                let min = schema.minimum.unwrap_or(DEFAULT_MINIMUM);
                vec![
                    ProbeValue::number(min - 1.0),
                    ProbeValue::number(min - 100.0),
                    ProbeValue::integer(MIN_SAFE_INTEGER),
                ]
            }
        }
    }
}
