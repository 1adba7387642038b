//! apiprobe: input-validation prober for HTTP APIs described by OpenAPI or
//! Swagger documents.
//!
//! A document is resolved into endpoints, rules generate adversarial values
//! for each parameter, and every value is sent as one request. A response
//! that accepts invalid input is a failure.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use apiprobe::config::Config;
//! use apiprobe::store::MemoryStore;
//! use apiprobe::{import_project, Prober, SelectionMode};
//!
//! # async fn demo() -> apiprobe::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let imported = import_project("http://localhost:3000/openapi.json", store.as_ref()).await?;
//! let prober = Prober::new(Config::default(), store)?;
//! let report = prober.run(&imported, &SelectionMode::Suggested, None).await?;
//! println!("Pass: {}, runs: {}", report.verdict.pass, report.runs.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod output;
pub mod plan;
pub mod probe;
pub mod resolver;
pub mod rules;
pub mod run;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use config::Config;
use document::{fetch::FETCH_TIMEOUT, ApiDocument};
use error::{ProbeError, Result};
use model::Endpoint;
use output::OutputFormat;
use plan::RuleSelection;
use probe::{Executor, HttpTransport};
use rules::policy::PolicyVerdict;
use rules::{RuleEngine, RuleId};
use run::{RunController, RunHandle, RunPhase, RunReport};
use store::{Project, Store};

/// A document that has been fetched, resolved and recorded as a project.
#[derive(Debug, Clone)]
pub struct ImportedProject {
    pub project: Project,
    pub document: ApiDocument,
    pub endpoints: Vec<Endpoint>,
    /// The project existed and its previous document had another fingerprint.
    pub document_changed: bool,
}

/// Load a document from a local file path or an HTTP(S) URL.
pub async fn load_document(source: &str) -> Result<ApiDocument> {
    let path = Path::new(source);
    if path.is_file() {
        let content = std::fs::read_to_string(path)?;
        return ApiDocument::parse_str(&content);
    }
    document::fetch_document(source, FETCH_TIMEOUT).await
}

/// Fetch and resolve a document, then upsert its project in the store.
///
/// Re-importing the same source updates the existing project in place.
pub async fn import_project(source: &str, store: &dyn Store) -> Result<ImportedProject> {
    let document = load_document(source).await?;
    let endpoints = resolver::resolve(&document)?;
    let previous = store.load_projects()?.into_iter().find(|p| p.url == source);
    let project = upsert_project(source, &document, &endpoints, store)?;
    let document_changed = previous.is_some_and(|p| p.fingerprint != project.fingerprint);
    if document_changed {
        info!(project = %project.id, "document changed since last import");
    }
    Ok(ImportedProject {
        project,
        document,
        endpoints,
        document_changed,
    })
}

/// Create or update the project stored for `url`.
pub fn upsert_project(
    url: &str,
    document: &ApiDocument,
    endpoints: &[Endpoint],
    store: &dyn Store,
) -> Result<Project> {
    let info = document.info();
    let now = Utc::now();
    let existing = store.load_projects()?.into_iter().find(|p| p.url == url);

    let project = Project {
        id: existing
            .as_ref()
            .map(|p| p.id.clone())
            .unwrap_or_else(Project::new_id),
        name: if info.title.is_empty() {
            "Unnamed API".into()
        } else {
            info.title
        },
        description: info.description,
        url: url.to_string(),
        base_url: document.base_url(),
        version: document.version.label(),
        api_version: info.version,
        fingerprint: document.fingerprint.clone(),
        created_at: existing.as_ref().map_or(now, |p| p.created_at),
        updated_at: now,
        last_tested_at: existing.as_ref().and_then(|p| p.last_tested_at),
        endpoint_ids: endpoints.iter().map(|e| e.id.clone()).collect(),
    };
    store.save_project(&project)?;
    info!(
        project = %project.id,
        endpoints = project.endpoint_ids.len(),
        updated = existing.is_some(),
        "project imported"
    );
    Ok(project)
}

/// How rules are chosen for each endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// The configured default rule set.
    Defaults,
    /// Rules suggested by each parameter's shape.
    Suggested,
    /// Every rule.
    All,
    /// Exactly these rules.
    Rules(Vec<RuleId>),
}

impl SelectionMode {
    /// `defaults`, `suggested`, `all`, or a comma-separated rule list.
    /// Unknown rule names are dropped.
    pub fn from_str_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "defaults" | "default" => Self::Defaults,
            "suggested" | "smart" => Self::Suggested,
            "all" => Self::All,
            list => Self::Rules(list.split(',').filter_map(RuleId::from_str_lenient).collect()),
        }
    }

    pub fn selection(&self, endpoint: &Endpoint, engine: &RuleEngine, config: &Config) -> RuleSelection {
        match self {
            Self::Defaults => RuleSelection::defaults(config),
            Self::Suggested => RuleSelection::suggested(endpoint, engine),
            Self::All => RuleSelection::all(),
            Self::Rules(rules) => RuleSelection::enabled(rules),
        }
    }
}

/// Outcome of probing one project.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub target_name: String,
    pub runs: Vec<RunReport>,
    pub verdict: PolicyVerdict,
}

/// Runs endpoints of an imported project one after another through a
/// single controller.
pub struct Prober {
    config: Config,
    engine: Arc<RuleEngine>,
    controller: RunController,
}

impl Prober {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let transport = HttpTransport::new(config.run.request_timeout())?;
        let executor = Executor::new(Arc::new(transport));
        Ok(Self::with_executor(config, store, executor))
    }

    /// Build around a custom executor (e.g. a non-HTTP transport).
    pub fn with_executor(config: Config, store: Arc<dyn Store>, executor: Executor) -> Self {
        let engine = Arc::new(RuleEngine::new());
        let controller = RunController::new(executor, engine.clone(), store)
            .with_delay(config.run.test_delay());
        Self {
            config,
            engine,
            controller,
        }
    }

    pub fn with_controller(mut self, f: impl FnOnce(RunController) -> RunController) -> Self {
        self.controller = f(self.controller);
        self
    }

    /// Pause, resume or stop the endpoint currently running.
    pub fn handle(&self) -> RunHandle {
        self.controller.handle()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe the project's endpoints, optionally narrowed by `filter`
    /// (endpoint id, or a substring of the path). A stop ends the whole
    /// probe after the current endpoint.
    pub async fn run(
        &self,
        imported: &ImportedProject,
        mode: &SelectionMode,
        filter: Option<&str>,
    ) -> Result<ProbeReport> {
        let base_url = self
            .config
            .run
            .base_url
            .clone()
            .unwrap_or_else(|| imported.project.base_url.clone());
        if base_url.trim().is_empty() {
            return Err(ProbeError::Config(
                "document declares no server; set run.base_url or pass --base-url".into(),
            ));
        }

        let endpoints: Vec<&Endpoint> = imported
            .endpoints
            .iter()
            .filter(|e| filter.map_or(true, |f| e.id == f || e.path.contains(f)))
            .collect();
        if endpoints.is_empty() {
            return Err(ProbeError::NotFound(format!(
                "no endpoint matches '{}'",
                filter.unwrap_or_default()
            )));
        }

        let mut runs = Vec::new();
        for endpoint in endpoints {
            let selection = mode.selection(endpoint, &self.engine, &self.config);
            let report = self.controller.start(endpoint, &selection, &base_url).await?;
            let stopped = report.phase == RunPhase::Stopped;
            runs.push(report);
            if stopped {
                break;
            }
        }

        let results: Vec<_> = runs.iter().flat_map(|r| r.results.iter().cloned()).collect();
        let marks: Vec<_> = runs
            .iter()
            .flat_map(|r| r.false_positives.iter().cloned())
            .collect();
        let verdict = self.config.policy.evaluate(&results, &marks);

        Ok(ProbeReport {
            target_name: imported.project.name.clone(),
            runs,
            verdict,
        })
    }
}

/// Render a probe report in the specified format.
pub fn render_report(report: &ProbeReport, format: OutputFormat) -> Result<String> {
    output::render(&report.runs, &report.verdict, format, &report.target_name)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::probe::{ProbeRequest, ProbeResponse, Transport, TransportError};
    use crate::run::Sleeper;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    const PETSTORE: &str = r#"
openapi: 3.0.1
info:
  title: Pets
  version: 1.2.0
servers:
  - url: http://localhost:3000
paths:
  /pets/{id}:
    get:
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: integer
  /pets:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
          maxLength: 40
"#;

    /// Rejects everything except strings containing tabs or line breaks.
    struct PickyApi;

    #[async_trait]
    impl Transport for PickyApi {
        async fn send(&self, request: &ProbeRequest) -> std::result::Result<ProbeResponse, TransportError> {
            let blank = request
                .body
                .as_ref()
                .and_then(|b| b.get("name"))
                .and_then(|v| v.as_str())
                .is_some_and(|s| s.contains(|c| c == '\t' || c == '\n'));
            Ok(ProbeResponse {
                status: if blank { 201 } else { 400 },
            })
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn imported(store: &dyn Store) -> ImportedProject {
        let document = ApiDocument::parse_str(PETSTORE).unwrap();
        let endpoints = resolver::resolve(&document).unwrap();
        let project = upsert_project("pets.yaml", &document, &endpoints, store).unwrap();
        ImportedProject {
            project,
            document,
            endpoints,
            document_changed: false,
        }
    }

    fn prober(store: Arc<MemoryStore>) -> Prober {
        Prober::with_executor(Config::default(), store, Executor::new(Arc::new(PickyApi)))
            .with_controller(|c| c.with_sleeper(Arc::new(NoSleep)))
    }

    #[test]
    fn reimport_updates_project_in_place() {
        let store = MemoryStore::new();
        let first = imported(&store).project;
        let second = imported(&store).project;
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.load_projects().unwrap().len(), 1);
        assert_eq!(second.name, "Pets");
        assert_eq!(second.version, "OpenAPI 3.0.1");
        assert_eq!(second.endpoint_ids, vec!["GET__pets_id", "POST__pets"]);
    }

    #[tokio::test]
    async fn reimport_detects_changed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pets.yaml");
        std::fs::write(&path, PETSTORE).unwrap();
        let source = path.to_str().unwrap();
        let store = MemoryStore::new();

        let first = import_project(source, &store).await.unwrap();
        assert!(!first.document_changed);
        assert_eq!(first.project.fingerprint, first.document.fingerprint);

        let again = import_project(source, &store).await.unwrap();
        assert!(!again.document_changed);

        std::fs::write(&path, PETSTORE.replace("1.2.0", "1.3.0")).unwrap();
        let changed = import_project(source, &store).await.unwrap();
        assert!(changed.document_changed);
        assert_eq!(changed.project.id, first.project.id);
        assert_ne!(changed.project.fingerprint, first.project.fingerprint);
    }

    #[tokio::test]
    async fn suggested_run_flags_whitespace_acceptance() {
        let store = Arc::new(MemoryStore::new());
        let project = imported(store.as_ref());
        let report = prober(store.clone())
            .run(&project, &SelectionMode::Suggested, None)
            .await
            .unwrap();

        assert_eq!(report.runs.len(), 2);
        let post = &report.runs[1];
        assert_eq!(post.endpoint_id, "POST__pets");
        // REQUIRED_CHECK 4 + WHITESPACE 6 + MAX_STRING 3
        assert_eq!(post.results.len(), 13);
        // "\t", "\n", "\r\n" and the mixed whitespace probe get through.
        assert_eq!(post.summary.failed, 4);
        // Whitespace acceptance is low severity: below the default threshold.
        assert!(report.verdict.pass);

        let text = render_report(&report, OutputFormat::Console).unwrap();
        assert!(text.contains("POST /pets"));
        let stamped = store.get_project(&project.project.id).unwrap().unwrap();
        assert!(stamped.last_tested_at.is_some());
    }

    #[tokio::test]
    async fn filter_and_missing_base_url() {
        let store = Arc::new(MemoryStore::new());
        let mut project = imported(store.as_ref());
        let prober = prober(store);

        let report = prober
            .run(&project, &SelectionMode::Rules(vec![RuleId::NoString]), Some("GET__pets_id"))
            .await
            .unwrap();
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.runs[0].results.len(), 6);

        let err = prober.run(&project, &SelectionMode::All, Some("/nope")).await.unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));

        project.project.base_url.clear();
        let err = prober.run(&project, &SelectionMode::All, None).await.unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }

    #[test]
    fn selection_mode_parsing() {
        assert_eq!(SelectionMode::from_str_lenient("ALL"), SelectionMode::All);
        assert_eq!(SelectionMode::from_str_lenient("suggested"), SelectionMode::Suggested);
        assert_eq!(
            SelectionMode::from_str_lenient("no-string,bogus,EMAIL_CHECK"),
            SelectionMode::Rules(vec![RuleId::NoString, RuleId::EmailCheck])
        );
    }
}
