use crate::error::Result;
use crate::rules::policy::PolicyVerdict;
use crate::run::RunReport;

use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    runs: &'a [RunReport],
    verdict: &'a PolicyVerdict,
}

/// Render run reports as a JSON document.
pub fn render(runs: &[RunReport], verdict: &PolicyVerdict) -> Result<String> {
    let report = JsonReport { runs, verdict };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}
