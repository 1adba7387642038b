//! Persistence of projects, results, false positives, settings and history.
//!
//! Every `Store` method takes `&self`; implementations synchronize
//! internally so concurrent runs can share one store behind an `Arc`.

mod cell;
pub mod file;
pub mod memory;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::probe::TestResult;
use crate::run::HistoryEntry;

pub use file::FileStore;
pub use memory::MemoryStore;

/// An imported API document and what was extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// `project_<uuid>`.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Where the document was fetched from. Projects are unique by URL.
    pub url: String,
    pub base_url: String,
    /// Document dialect label, e.g. "OpenAPI 3.0.1".
    pub version: String,
    pub api_version: String,
    /// Fingerprint of the document last imported for this project.
    #[serde(default)]
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_tested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub endpoint_ids: Vec<String>,
}

impl Project {
    pub fn new_id() -> String {
        format!("project_{}", uuid::Uuid::new_v4())
    }
}

/// A test case the user accepted as expected behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalsePositiveMark {
    pub endpoint_id: String,
    pub test_id: String,
    #[serde(default)]
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub dark_mode: bool,
    pub max_concurrent_tests: u32,
    pub test_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: true,
            max_concurrent_tests: 5,
            test_delay_ms: 100,
        }
    }
}

/// Everything a store holds, as one document. Also the export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Results keyed by endpoint id.
    #[serde(default)]
    pub test_results: BTreeMap<String, Vec<TestResult>>,
    #[serde(default)]
    pub false_positives: Vec<FalsePositiveMark>,
    #[serde(default)]
    pub settings: Settings,
    pub exported_at: DateTime<Utc>,
}

/// Persistence collaborator for projects and runs.
pub trait Store: Send + Sync {
    /// Insert or replace by project id.
    fn save_project(&self, project: &Project) -> Result<()>;
    fn load_projects(&self) -> Result<Vec<Project>>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    /// Remove a project together with the stored results of its endpoints.
    fn delete_project(&self, id: &str) -> Result<()>;

    /// Replace the results stored for an endpoint.
    fn save_test_results(&self, endpoint_id: &str, results: &[TestResult]) -> Result<()>;
    fn load_test_results(&self, endpoint_id: &str) -> Result<Vec<TestResult>>;

    /// Mark a test case as a false positive. Marking twice keeps one entry
    /// with the latest reason.
    fn save_false_positive(
        &self,
        endpoint_id: &str,
        test_id: &str,
        reason: &str,
    ) -> Result<FalsePositiveMark>;
    /// Returns whether a mark was removed.
    fn remove_false_positive(&self, endpoint_id: &str, test_id: &str) -> Result<bool>;
    fn load_false_positives(&self) -> Result<Vec<FalsePositiveMark>>;

    fn load_settings(&self) -> Result<Settings>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;

    fn record_history(&self, entry: HistoryEntry) -> Result<()>;
    /// Most recent first.
    fn load_history(&self) -> Result<Vec<HistoryEntry>>;

    fn export_data(&self) -> Result<ExportBundle>;
    /// Replace projects, results, false positives and settings with the
    /// bundle's contents.
    fn import_data(&self, bundle: ExportBundle) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::HttpMethod;
    use crate::probe::{Outcome, EXPECTED_BEHAVIOR};
    use crate::rules::{ProbeValue, RuleId};
    use crate::run::{RunPhase, RunSummary};
    use pretty_assertions::assert_eq;

    pub(crate) fn project(url: &str, endpoint_ids: &[&str]) -> Project {
        let now = Utc::now();
        Project {
            id: Project::new_id(),
            name: "Pets".into(),
            description: String::new(),
            url: url.into(),
            base_url: "http://localhost:3000".into(),
            version: "OpenAPI 3.0.1".into(),
            api_version: "1.0.0".into(),
            fingerprint: String::new(),
            created_at: now,
            updated_at: now,
            last_tested_at: None,
            endpoint_ids: endpoint_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) fn result(endpoint_id: &str, id: &str) -> TestResult {
        TestResult {
            id: id.into(),
            endpoint_id: endpoint_id.into(),
            rule: RuleId::NoString,
            rule_name: RuleId::NoString.name().into(),
            parameter_name: "id".into(),
            test_value: ProbeValue::text("abc"),
            expected_behavior: EXPECTED_BEHAVIOR.into(),
            status: Some(400),
            transport_error: None,
            outcome: Outcome::Pass,
            severity: None,
            message: "API correctly rejected invalid input (400)".into(),
            remediation: None,
            timestamp: Utc::now(),
        }
    }

    fn history(endpoint_id: &str) -> HistoryEntry {
        HistoryEntry {
            endpoint_id: endpoint_id.into(),
            method: HttpMethod::Get,
            path: "/users/{id}".into(),
            timestamp: Utc::now(),
            summary: RunSummary::default(),
            phase: RunPhase::Completed,
        }
    }

    /// Behavior every `Store` implementation must show.
    pub(crate) fn exercise_store(store: &dyn Store) {
        let mut p = project("http://api/openapi.json", &["GET__users_id"]);
        store.save_project(&p).unwrap();
        p.name = "Renamed".into();
        store.save_project(&p).unwrap();
        assert_eq!(store.load_projects().unwrap().len(), 1);
        assert_eq!(store.get_project(&p.id).unwrap().unwrap().name, "Renamed");
        assert!(store.get_project("project_missing").unwrap().is_none());

        let results = vec![result("GET__users_id", "t0"), result("GET__users_id", "t1")];
        store.save_test_results("GET__users_id", &results).unwrap();
        store
            .save_test_results("POST__orders", &[result("POST__orders", "o0")])
            .unwrap();
        assert_eq!(store.load_test_results("GET__users_id").unwrap(), results);
        assert!(store.load_test_results("unknown").unwrap().is_empty());

        store.save_false_positive("GET__users_id", "t1", "first").unwrap();
        store.save_false_positive("GET__users_id", "t1", "second").unwrap();
        let marks = store.load_false_positives().unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].reason, "second");

        let mut settings = store.load_settings().unwrap();
        assert_eq!(settings, Settings::default());
        settings.test_delay_ms = 250;
        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings().unwrap().test_delay_ms, 250);

        store.record_history(history("first")).unwrap();
        store.record_history(history("second")).unwrap();
        let order: Vec<String> = store
            .load_history()
            .unwrap()
            .into_iter()
            .map(|h| h.endpoint_id)
            .collect();
        assert_eq!(order, vec!["second".to_string(), "first".to_string()]);

        let bundle = store.export_data().unwrap();
        assert_eq!(bundle.projects.len(), 1);
        assert_eq!(bundle.test_results.len(), 2);

        store.delete_project(&p.id).unwrap();
        assert!(store.load_projects().unwrap().is_empty());
        assert!(store.load_test_results("GET__users_id").unwrap().is_empty());
        assert_eq!(store.load_test_results("POST__orders").unwrap().len(), 1);

        assert!(store.remove_false_positive("GET__users_id", "t1").unwrap());
        assert!(!store.remove_false_positive("GET__users_id", "t1").unwrap());

        store.import_data(bundle.clone()).unwrap();
        assert_eq!(store.load_projects().unwrap(), bundle.projects);
        assert_eq!(store.load_false_positives().unwrap().len(), 1);
        assert_eq!(store.load_settings().unwrap().test_delay_ms, 250);
    }

    #[test]
    fn export_bundle_uses_camel_case_sections() {
        let bundle = MemoryStore::new().export_data().unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        for key in ["projects", "testResults", "falsePositives", "settings", "exportedAt"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["settings"]["testDelayMs"], serde_json::json!(100));
    }
}
