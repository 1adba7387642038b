use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// The closed set of validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    RequiredCheck,
    Whitespace,
    NoString,
    MaxString,
    MaxNumber,
    MinNumber,
    MaxDate,
    MinDate,
    EmailCheck,
    PhoneCheck,
}

impl RuleId {
    pub const ALL: [RuleId; 10] = [
        Self::RequiredCheck,
        Self::Whitespace,
        Self::NoString,
        Self::MaxString,
        Self::MaxNumber,
        Self::MinNumber,
        Self::MaxDate,
        Self::MinDate,
        Self::EmailCheck,
        Self::PhoneCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiredCheck => "REQUIRED_CHECK",
            Self::Whitespace => "WHITESPACE",
            Self::NoString => "NO_STRING",
            Self::MaxString => "MAX_STRING",
            Self::MaxNumber => "MAX_NUMBER",
            Self::MinNumber => "MIN_NUMBER",
            Self::MaxDate => "MAX_DATE",
            Self::MinDate => "MIN_DATE",
            Self::EmailCheck => "EMAIL_CHECK",
            Self::PhoneCheck => "PHONE_CHECK",
        }
    }

    /// Accepts `MAX_STRING`, `max_string` and `max-string`.
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL.into_iter().find(|r| r.as_str() == normalized)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RequiredCheck => "Required Field",
            Self::Whitespace => "Whitespace Validation",
            Self::NoString => "Type Safety (No String)",
            Self::MaxString => "Maximum String Length",
            Self::MaxNumber => "Maximum Number Value",
            Self::MinNumber => "Minimum Number Value",
            Self::MaxDate => "Maximum Date",
            Self::MinDate => "Minimum Date",
            Self::EmailCheck => "Email Format",
            Self::PhoneCheck => "Phone Format",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RequiredCheck => "Sends null, omitted and blank values for the parameter",
            Self::Whitespace => "Sends whitespace-only strings",
            Self::NoString => "Sends non-numeric strings to a numeric parameter",
            Self::MaxString => "Sends strings longer than the declared maximum length",
            Self::MaxNumber => "Sends numbers above the declared maximum",
            Self::MinNumber => "Sends numbers below the declared minimum",
            Self::MaxDate => "Sends dates in the future",
            Self::MinDate => "Sends dates in the past",
            Self::EmailCheck => "Sends malformed email addresses",
            Self::PhoneCheck => "Sends malformed phone numbers",
        }
    }

    /// Severity of accepting this rule's probes.
    pub fn severity(&self) -> Severity {
        match self {
            Self::RequiredCheck | Self::EmailCheck | Self::NoString => Severity::High,
            Self::PhoneCheck | Self::MaxString | Self::MaxNumber | Self::MinNumber => {
                Severity::Medium
            }
            Self::MaxDate | Self::MinDate | Self::Whitespace => Severity::Low,
        }
    }

    /// Whether the rule is part of the default rule set.
    pub fn enabled_by_default(&self) -> bool {
        !matches!(self, Self::MaxDate | Self::MinDate)
    }

    /// Fix advice for a parameter that accepted this rule's probes.
    pub fn remediation(&self, parameter: &str) -> String {
        match self {
            Self::Whitespace => {
                format!("Trim \"{parameter}\" and reject empty or whitespace-only values")
            }
            Self::NoString => format!("Add type validation to ensure \"{parameter}\" is numeric"),
            Self::MaxString => {
                format!("Enforce a maxLength constraint (e.g. 100-255 chars) on \"{parameter}\"")
            }
            Self::MaxNumber => format!("Enforce a maximum value constraint on \"{parameter}\""),
            Self::MinNumber => format!("Enforce a minimum value constraint on \"{parameter}\""),
            Self::MaxDate => format!("Enforce a maximum date constraint on \"{parameter}\""),
            Self::MinDate => format!("Enforce a minimum date constraint on \"{parameter}\""),
            Self::EmailCheck => {
                format!("Use RFC-5322-compliant email validation on \"{parameter}\"")
            }
            Self::PhoneCheck => format!("Add phone number format validation on \"{parameter}\""),
            Self::RequiredCheck => {
                format!("Mark \"{parameter}\" as required and validate its presence")
            }
        }
    }

    pub fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: *self,
            name: self.name().into(),
            description: self.description().into(),
            severity: self.severity(),
            enabled_by_default: self.enabled_by_default(),
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserialize a list of rule names leniently. Unknown names are skipped
/// with a warning.
pub fn lenient_rule_list<'de, D, C>(deserializer: D) -> std::result::Result<C, D::Error>
where
    D: Deserializer<'de>,
    C: FromIterator<RuleId>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .iter()
        .filter_map(|name| {
            let rule = RuleId::from_str_lenient(name);
            if rule.is_none() {
                warn!(rule = %name, "ignoring unknown rule");
            }
            rule
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Metadata about a rule, used for `list-rules` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: RuleId,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub enabled_by_default: bool,
}
