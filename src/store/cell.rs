use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ExportBundle, FalsePositiveMark, Project, Settings, Store};
use crate::error::Result;
use crate::probe::TestResult;
use crate::run::HistoryEntry;

/// In-memory state shared by the store implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreData {
    projects: Vec<Project>,
    test_results: BTreeMap<String, Vec<TestResult>>,
    false_positives: Vec<FalsePositiveMark>,
    settings: Settings,
    history: Vec<HistoryEntry>,
}

/// Access to a `StoreData` cell. Implementors get `Store` for free.
pub trait DataCell: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> Result<R>;
    /// Apply a mutation. File-backed cells persist before returning, and keep
    /// the previous state when persisting fails.
    fn write<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R>;
}

impl<T: DataCell> Store for T {
    fn save_project(&self, project: &Project) -> Result<()> {
        self.write(|data| {
            match data.projects.iter_mut().find(|p| p.id == project.id) {
                Some(existing) => *existing = project.clone(),
                None => data.projects.push(project.clone()),
            }
        })
    }

    fn load_projects(&self) -> Result<Vec<Project>> {
        self.read(|data| data.projects.clone())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.read(|data| data.projects.iter().find(|p| p.id == id).cloned())
    }

    fn delete_project(&self, id: &str) -> Result<()> {
        self.write(|data| {
            let Some(pos) = data.projects.iter().position(|p| p.id == id) else {
                return;
            };
            let project = data.projects.remove(pos);
            for endpoint_id in &project.endpoint_ids {
                data.test_results.remove(endpoint_id);
            }
        })
    }

    fn save_test_results(&self, endpoint_id: &str, results: &[TestResult]) -> Result<()> {
        self.write(|data| {
            data.test_results
                .insert(endpoint_id.to_string(), results.to_vec());
        })
    }

    fn load_test_results(&self, endpoint_id: &str) -> Result<Vec<TestResult>> {
        self.read(|data| {
            data.test_results
                .get(endpoint_id)
                .cloned()
                .unwrap_or_default()
        })
    }

    fn save_false_positive(
        &self,
        endpoint_id: &str,
        test_id: &str,
        reason: &str,
    ) -> Result<FalsePositiveMark> {
        let mark = FalsePositiveMark {
            endpoint_id: endpoint_id.to_string(),
            test_id: test_id.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        self.write(|data| {
            data.false_positives
                .retain(|fp| !(fp.endpoint_id == endpoint_id && fp.test_id == test_id));
            data.false_positives.push(mark.clone());
        })?;
        Ok(mark)
    }

    fn remove_false_positive(&self, endpoint_id: &str, test_id: &str) -> Result<bool> {
        self.write(|data| {
            let before = data.false_positives.len();
            data.false_positives
                .retain(|fp| !(fp.endpoint_id == endpoint_id && fp.test_id == test_id));
            data.false_positives.len() != before
        })
    }

    fn load_false_positives(&self) -> Result<Vec<FalsePositiveMark>> {
        self.read(|data| data.false_positives.clone())
    }

    fn load_settings(&self) -> Result<Settings> {
        self.read(|data| data.settings.clone())
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write(|data| data.settings = settings.clone())
    }

    fn record_history(&self, entry: HistoryEntry) -> Result<()> {
        self.write(|data| data.history.insert(0, entry))
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        self.read(|data| data.history.clone())
    }

    fn export_data(&self) -> Result<ExportBundle> {
        self.read(|data| ExportBundle {
            projects: data.projects.clone(),
            test_results: data.test_results.clone(),
            false_positives: data.false_positives.clone(),
            settings: data.settings.clone(),
            exported_at: Utc::now(),
        })
    }

    fn import_data(&self, bundle: ExportBundle) -> Result<()> {
        self.write(|data| {
            data.projects = bundle.projects;
            data.test_results = bundle.test_results;
            data.false_positives = bundle.false_positives;
            data.settings = bundle.settings;
        })
    }
}
