use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::HttpMethod;
use crate::probe::{Outcome, TestResult};
use crate::store::FalsePositiveMark;

use super::RunPhase;

/// Aggregate counts for one endpoint's results.
///
/// A `fail` whose test id is marked as a false positive counts as passed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub inconclusive: usize,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult], false_positives: &[FalsePositiveMark]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail if is_false_positive(result, false_positives) => summary.passed += 1,
                Outcome::Fail => summary.failed += 1,
                Outcome::Inconclusive => summary.inconclusive += 1,
            }
        }
        summary
    }
}

/// Failed results that have not been accepted as false positives.
pub fn failed_tests<'a>(
    results: &'a [TestResult],
    false_positives: &[FalsePositiveMark],
) -> Vec<&'a TestResult> {
    results
        .iter()
        .filter(|r| r.is_fail() && !is_false_positive(r, false_positives))
        .collect()
}

pub fn is_false_positive(result: &TestResult, false_positives: &[FalsePositiveMark]) -> bool {
    false_positives
        .iter()
        .any(|fp| fp.endpoint_id == result.endpoint_id && fp.test_id == result.id)
}

/// Record of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub endpoint_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub summary: RunSummary,
    pub phase: RunPhase,
}
