use crate::probe::{Outcome, TestResult};
use crate::rules::policy::PolicyVerdict;
use crate::rules::Severity;
use crate::run::{RunPhase, RunReport};

/// Render run reports as console text: one block per endpoint, failures
/// first (highest severity first), then the policy verdict.
pub fn render(reports: &[RunReport], verdict: &PolicyVerdict) -> String {
    let mut output = String::new();

    if reports.is_empty() {
        output.push_str("\n  No endpoints were tested.\n\n");
        return output;
    }

    for report in reports {
        let s = &report.summary;
        output.push_str(&format!(
            "\n  {} {}  {} test(s): {} passed, {} failed, {} inconclusive",
            report.method, report.path, s.total, s.passed, s.failed, s.inconclusive
        ));
        if report.phase == RunPhase::Stopped {
            output.push_str(&format!(" (stopped after {}/{})", s.total, report.planned));
        }
        output.push('\n');

        let mut failed = report.failed_tests();
        failed.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.id.cmp(&b.id)));
        for result in failed {
            push_failure(&mut output, result);
        }

        let inconclusive = report
            .results
            .iter()
            .filter(|r| r.outcome == Outcome::Inconclusive)
            .count();
        if inconclusive > 0 {
            output.push_str(&format!(
                "           {inconclusive} inconclusive (auth walls, unexpected statuses or transport errors)\n"
            ));
        }
    }

    // Verdict
    let status = if verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "\n  Result: {} (threshold: {}, highest: {})\n\n",
        status,
        verdict.fail_threshold,
        verdict
            .highest_severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".into()),
    ));

    output
}

fn push_failure(output: &mut String, result: &TestResult) {
    let severity_tag = match result.severity {
        Some(Severity::High) => "[HIGH]    ",
        Some(Severity::Medium) => "[MEDIUM]  ",
        Some(Severity::Low) | None => "[LOW]     ",
    };
    output.push_str(&format!(
        "  {} {} {} = {}\n",
        severity_tag, result.rule, result.parameter_name, result.test_value
    ));
    output.push_str(&format!("           {}\n", result.message));
    output.push_str(&format!("           id: {}\n", result.id));
    if let Some(remediation) = &result.remediation {
        output.push_str(&format!("           fix: {}\n", remediation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::{report, verdict};

    #[test]
    fn shows_failures_and_verdict() {
        let report = report();
        let text = render(std::slice::from_ref(&report), &verdict(&report));
        assert!(text.contains("POST /users  3 test(s): 1 passed, 1 failed, 1 inconclusive"));
        assert!(text.contains("[HIGH]     EMAIL_CHECK email = \"plainaddress\""));
        assert!(text.contains("fix: Use RFC-5322-compliant email validation"));
        assert!(text.contains("Result: FAIL (threshold: high, highest: high)"));
    }

    #[test]
    fn empty_run_list() {
        let text = render(&[], &verdict(&report()));
        assert!(text.contains("No endpoints were tested"));
    }
}
