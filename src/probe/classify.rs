use super::result::Outcome;
use super::transport::{ProbeResponse, TransportError};
use crate::rules::{RuleId, Severity};

/// Classification of a single probe response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub severity: Option<Severity>,
    pub message: String,
}

/// Status codes that mean the API rejected the input.
const REJECTION_STATUSES: &[u16] = &[400, 413, 422];

/// Classify a response by status code:
/// rejection -> pass, 2xx -> fail, 401/403 -> inconclusive, anything else
/// (or no response at all) -> inconclusive.
pub fn classify(rule: RuleId, response: Result<&ProbeResponse, &TransportError>) -> Classification {
    let response = match response {
        Ok(r) => r,
        Err(e) => {
            return Classification {
                outcome: Outcome::Inconclusive,
                severity: None,
                message: format!("Transport error: {}", e.message),
            }
        }
    };

    let status = response.status;
    if REJECTION_STATUSES.contains(&status) {
        Classification {
            outcome: Outcome::Pass,
            severity: None,
            message: format!("API correctly rejected invalid input ({status})"),
        }
    } else if (200..300).contains(&status) {
        Classification {
            outcome: Outcome::Fail,
            severity: Some(rule.severity()),
            message: format!("API accepted invalid input ({status})"),
        }
    } else if status == 401 || status == 403 {
        Classification {
            outcome: Outcome::Inconclusive,
            severity: None,
            message: format!("Authentication required - cannot test ({status})"),
        }
    } else {
        Classification {
            outcome: Outcome::Inconclusive,
            severity: None,
            message: format!("Unexpected response ({status})"),
        }
    }
}
