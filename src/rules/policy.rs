use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::catalog::lenient_rule_list;
use super::{RuleId, Severity};
use crate::probe::TestResult;
use crate::run::is_false_positive;
use crate::store::FalsePositiveMark;

/// Policy verdict: the final pass/fail decision after dropping ignored
/// rules and accepted false positives from a run's failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub pass: bool,
    pub total_failures: usize,
    pub effective_failures: usize,
    pub highest_severity: Option<Severity>,
    pub fail_threshold: Severity,
}

/// Policy configuration loaded from `.apiprobe.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Minimum severity of an accepted probe that fails the run.
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    /// Rules whose failures never count.
    #[serde(default, deserialize_with = "lenient_rule_list")]
    pub ignore_rules: HashSet<RuleId>,
    /// Per-rule severity overrides.
    #[serde(default)]
    pub overrides: HashMap<RuleId, Severity>,
}

fn default_fail_on() -> Severity {
    Severity::High
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fail_on: Severity::High,
            ignore_rules: HashSet::new(),
            overrides: HashMap::new(),
        }
    }
}

impl Policy {
    /// Evaluate a run's results against this policy.
    pub fn evaluate(
        &self,
        results: &[TestResult],
        false_positives: &[FalsePositiveMark],
    ) -> PolicyVerdict {
        let failures: Vec<&TestResult> = results.iter().filter(|r| r.is_fail()).collect();
        let effective: Vec<Severity> = failures
            .iter()
            .filter(|r| !self.ignore_rules.contains(&r.rule))
            .filter(|r| !is_false_positive(r, false_positives))
            .map(|r| self.severity_of(r))
            .collect();

        let highest = effective.iter().copied().max();
        let failed = effective.iter().any(|&sev| sev >= self.fail_on);

        PolicyVerdict {
            pass: !failed,
            total_failures: failures.len(),
            effective_failures: effective.len(),
            highest_severity: highest,
            fail_threshold: self.fail_on,
        }
    }

    fn severity_of(&self, result: &TestResult) -> Severity {
        self.overrides
            .get(&result.rule)
            .copied()
            .or(result.severity)
            .unwrap_or_else(|| result.rule.severity())
    }
}
