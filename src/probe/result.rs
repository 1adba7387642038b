use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::{ProbeValue, RuleId, Severity};

/// How the API reacted to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The invalid input was rejected.
    Pass,
    /// The invalid input was accepted.
    Fail,
    /// Nothing can be concluded (auth wall, unexpected status, transport error).
    Inconclusive,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Behavior a correctly validating API shows for every probe.
pub const EXPECTED_BEHAVIOR: &str = "400/422 Bad Request";

/// The recorded outcome of one executed test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Identity of the test case.
    pub id: String,
    pub endpoint_id: String,
    pub rule: RuleId,
    pub rule_name: String,
    pub parameter_name: String,
    pub test_value: ProbeValue,
    pub expected_behavior: String,
    /// HTTP status, when a response arrived.
    pub status: Option<u16>,
    /// Network-level failure, when no response arrived.
    pub transport_error: Option<String>,
    pub outcome: Outcome,
    /// Present only on `Fail`.
    pub severity: Option<Severity>,
    pub message: String,
    /// Present only on `Fail`.
    pub remediation: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn is_fail(&self) -> bool {
        self.outcome == Outcome::Fail
    }
}
