use std::collections::BTreeSet;

use crate::error::Result;
use crate::probe::TestResult;
use crate::rules::{RuleId, Severity};
use crate::run::RunReport;

use serde_json::{json, Value};

/// Render accepted probes as SARIF 2.1.0.
///
/// Only failures not marked as false positives become SARIF results. The
/// endpoint is reported as a logical location since there is no source file.
pub fn render(reports: &[RunReport], target_name: &str) -> Result<String> {
    let failures: Vec<(&RunReport, &TestResult)> = reports
        .iter()
        .flat_map(|report| report.failed_tests().into_iter().map(move |r| (report, r)))
        .collect();

    let rules: Vec<Value> = failures
        .iter()
        .map(|(_, r)| r.rule)
        .collect::<BTreeSet<RuleId>>()
        .into_iter()
        .map(|rule| {
            json!({
                "id": rule.as_str(),
                "name": rule.name(),
                "shortDescription": { "text": rule.name() },
                "fullDescription": { "text": rule.description() },
                "defaultConfiguration": {
                    "level": severity_to_sarif_level(rule.severity()),
                },
            })
        })
        .collect();

    let results: Vec<Value> = failures
        .iter()
        .map(|(report, r)| {
            let mut result = json!({
                "ruleId": r.rule.as_str(),
                "level": severity_to_sarif_level(r.severity.unwrap_or_else(|| r.rule.severity())),
                "message": {
                    "text": format!("{} for parameter '{}' with value {}", r.message, r.parameter_name, r.test_value),
                },
                "locations": [{
                    "logicalLocations": [{
                        "fullyQualifiedName": format!("{} {}", report.method, report.path),
                        "kind": "function",
                    }],
                }],
                "partialFingerprints": { "testId": r.id },
            });

            if let Some(remediation) = &r.remediation {
                result["fixes"] = json!([{
                    "description": { "text": remediation },
                    "artifactChanges": [],
                }]);
            }

            result
        })
        .collect();

    let sarif = json!({
        "$schema": "https://docs.oasis-open.org/sarif/sarif/v2.1.0/errata01/os/schemas/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "apiprobe",
                    "version": env!("CARGO_PKG_VERSION"),
                    "semanticVersion": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                },
            },
            "results": results,
            "automationDetails": {
                "id": format!("apiprobe/{}", target_name),
            },
        }],
    });

    let output = serde_json::to_string_pretty(&sarif)?;
    Ok(output)
}

fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}
