use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};

use crate::model::{Parameter, Schema};
use crate::rules::{GenerationContext, ProbeValue, RuleId, ValidationRule};

const FAR_FUTURE: &[&str] = &["2099-12-31T23:59:59Z", "9999-12-31T23:59:59Z"];
const FAR_PAST: &[&str] = &["1900-01-01T00:00:00Z", "1970-01-01T00:00:00Z"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
}

/// MIN_DATE / MAX_DATE: date strings far from the present should be rejected.
///
/// Probes are one day and one year away from the reference instant, then two
/// fixed extremes.
pub struct DateBoundRule {
    bound: Bound,
}

impl DateBoundRule {
    pub fn min() -> Self {
        Self { bound: Bound::Min }
    }

    pub fn max() -> Self {
        Self { bound: Bound::Max }
    }
}

impl ValidationRule for DateBoundRule {
    fn id(&self) -> RuleId {
        match self.bound {
            Bound::Min => RuleId::MinDate,
            Bound::Max => RuleId::MaxDate,
        }
    }

    fn applies_to(&self, parameter: &Parameter) -> bool {
        let schema = &parameter.schema;
        schema.is_string() && (schema.has_format("date") || schema.has_format("date-time"))
    }

    fn generate(&self, _schema: &Schema, ctx: &GenerationContext) -> Vec<ProbeValue> {
        let now = ctx.now;
        let (day, year, extremes) = match self.bound {
            Bound::Max => (
                now + Duration::days(1),
                now.checked_add_months(Months::new(12))
                    .unwrap_or(now + Duration::days(365)),
                FAR_FUTURE,
            ),
            Bound::Min => (
                now - Duration::days(1),
                now.checked_sub_months(Months::new(12))
                    .unwrap_or(now - Duration::days(365)),
                FAR_PAST,
            ),
        };

        let mut values = vec![iso(day), iso(year)];
        values.extend(extremes.iter().map(|s| ProbeValue::text(*s)));
        values
    }
}

fn iso(at: DateTime<Utc>) -> ProbeValue {
    ProbeValue::text(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaType;
    use crate::rules::builtin::test_support::param;
    use chrono::TimeZone;

    fn ctx() -> GenerationContext {
        GenerationContext::at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
    }

    #[test]
    fn max_date_probes_future() {
        let values = DateBoundRule::max().generate(&Schema::default(), &ctx());
        assert_eq!(
            values,
            vec![
                ProbeValue::text("2024-03-16T12:00:00.000Z"),
                ProbeValue::text("2025-03-15T12:00:00.000Z"),
                ProbeValue::text("2099-12-31T23:59:59Z"),
                ProbeValue::text("9999-12-31T23:59:59Z"),
            ]
        );
    }

    #[test]
    fn min_date_probes_past() {
        let values = DateBoundRule::min().generate(&Schema::default(), &ctx());
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], ProbeValue::text("2024-03-14T12:00:00.000Z"));
        assert_eq!(values[3], ProbeValue::text("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn applies_to_date_formats_only() {
        for format in ["date", "date-time"] {
            let schema = Schema {
                format: Some(format.into()),
                ..Schema::of_type(SchemaType::String)
            };
            assert!(DateBoundRule::min().applies_to(&param("at", false, schema)));
        }
        let plain = Schema::of_type(SchemaType::String);
        assert!(!DateBoundRule::max().applies_to(&param("at", false, plain)));
    }
}
