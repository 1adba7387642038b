use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `Number.MAX_SAFE_INTEGER`, the largest integer every JSON consumer
/// represents exactly.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// One concrete adversarial input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ProbeValue {
    /// The parameter is left out of the request entirely.
    Absent,
    Json(Value),
}

impl ProbeValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Json(Value::String(s.into()))
    }

    pub fn null() -> Self {
        Self::Json(Value::Null)
    }

    /// A number, emitted as an integer when it has no fractional part.
    /// Overflowed arithmetic saturates at the largest finite double.
    pub fn number(n: f64) -> Self {
        let n = n.clamp(f64::MIN, f64::MAX);
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 {
            Self::Json(Value::from(n as i64))
        } else {
            Self::Json(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
        }
    }

    pub fn integer(n: i64) -> Self {
        Self::Json(Value::from(n))
    }

    /// Text form for path, query, header and cookie positions.
    ///
    /// `None` means the parameter should be omitted.
    pub fn as_param_text(&self) -> Option<String> {
        match self {
            Self::Absent | Self::Json(Value::Null) => None,
            Self::Json(Value::String(s)) => Some(s.clone()),
            Self::Json(other) => Some(other.to_string()),
        }
    }

    /// Short human-readable rendering for reports.
    pub fn summary(&self) -> String {
        const LIMIT: usize = 40;
        match self {
            Self::Absent => "<absent>".into(),
            Self::Json(Value::String(s)) if s.chars().count() > LIMIT => {
                let head: String = s.chars().take(LIMIT).collect();
                format!("{head:?}... ({} chars)", s.chars().count())
            }
            Self::Json(Value::String(s)) => format!("{s:?}"),
            Self::Json(other) => other.to_string(),
        }
    }
}

impl std::fmt::Display for ProbeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Inputs to value generation that are not part of the schema.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext {
    /// Reference instant for date probes.
    pub now: DateTime<Utc>,
}

impl GenerationContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}
