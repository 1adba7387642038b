//! Run controller: drives the executor over one endpoint's test cases, one
//! probe at a time, honoring pause/resume/stop and pacing between probes.

pub mod state;
pub mod summary;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ProbeError, Result};
use crate::model::{Endpoint, HttpMethod};
use crate::plan::{RuleSelection, TestCaseBuilder};
use crate::probe::{Executor, TestResult};
use crate::rules::{GenerationContext, RuleEngine};
use crate::store::{FalsePositiveMark, Store};

pub use state::{RunHandle, RunPhase, RunState};
pub use summary::{failed_tests, is_false_positive, HistoryEntry, RunSummary};

/// Pause between consecutive probes.
pub const TEST_DELAY: Duration = Duration::from_millis(100);

/// Source of the inter-test delay.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Everything a finished (or stopped) run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub endpoint_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub base_url: String,
    pub phase: RunPhase,
    pub planned: usize,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
    /// Marks for this endpoint known when the run finished.
    pub false_positives: Vec<FalsePositiveMark>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Failures not accepted as false positives.
    pub fn failed_tests(&self) -> Vec<&TestResult> {
        failed_tests(&self.results, &self.false_positives)
    }
}

/// Owns the run state for one endpoint at a time. Use one controller per
/// endpoint to run several concurrently.
pub struct RunController {
    executor: Executor,
    engine: Arc<RuleEngine>,
    store: Arc<dyn Store>,
    sleeper: Arc<dyn Sleeper>,
    delay: Duration,
    ctx: Option<GenerationContext>,
    handle: RunHandle,
}

impl RunController {
    pub fn new(executor: Executor, engine: Arc<RuleEngine>, store: Arc<dyn Store>) -> Self {
        Self {
            executor,
            engine,
            store,
            sleeper: Arc::new(TokioSleeper),
            delay: TEST_DELAY,
            ctx: None,
            handle: RunHandle::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fix the reference instant for date probes.
    pub fn with_generation_context(mut self, ctx: GenerationContext) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Handle for pausing, stopping and observing this controller's runs.
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    /// Run every selected test case against `endpoint`, in build order.
    ///
    /// Returns when the cases are exhausted or the run is stopped. Results
    /// and a history entry are handed to the store either way. Store
    /// failures at that point are logged, not returned.
    pub async fn start(
        &self,
        endpoint: &Endpoint,
        selection: &RuleSelection,
        base_url: &str,
    ) -> Result<RunReport> {
        if self.handle.phase().is_active() {
            return Err(ProbeError::RunInProgress);
        }

        let marks = self.store.load_false_positives()?;
        let builder = TestCaseBuilder::new(&self.engine)
            .with_context(self.ctx.unwrap_or_default());
        let cases = builder.build(endpoint, selection, &marks);

        if !self.handle.begin(cases.len()) {
            return Err(ProbeError::RunInProgress);
        }
        let started_at = Utc::now();
        info!(
            endpoint = %endpoint.id,
            cases = cases.len(),
            base_url = %base_url,
            "run started"
        );

        for case in &cases {
            match self.handle.phase() {
                RunPhase::Stopped => break,
                RunPhase::Paused => {
                    if self.handle.wait_while_paused().await == RunPhase::Stopped {
                        break;
                    }
                }
                _ => {}
            }

            self.handle.set_current(&case.id);
            let result = self.executor.execute(case, endpoint, base_url).await;
            self.handle.record(result);
            self.sleeper.sleep(self.delay).await;
        }

        let phase = self.handle.finish();
        let results = self.handle.results();
        let false_positives = self.current_marks(&endpoint.id).unwrap_or(marks);
        let false_positives: Vec<FalsePositiveMark> = false_positives
            .into_iter()
            .filter(|fp| fp.endpoint_id == endpoint.id)
            .collect();
        let summary = RunSummary::from_results(&results, &false_positives);
        let finished_at = Utc::now();
        info!(
            endpoint = %endpoint.id,
            phase = %phase,
            passed = summary.passed,
            failed = summary.failed,
            inconclusive = summary.inconclusive,
            "run finished"
        );

        self.persist(endpoint, &results, summary, phase, finished_at);

        Ok(RunReport {
            endpoint_id: endpoint.id.clone(),
            method: endpoint.method,
            path: endpoint.path.clone(),
            base_url: base_url.to_string(),
            phase,
            planned: cases.len(),
            results,
            summary,
            false_positives,
            started_at,
            finished_at,
        })
    }

    fn current_marks(&self, endpoint_id: &str) -> Option<Vec<FalsePositiveMark>> {
        match self.store.load_false_positives() {
            Ok(marks) => Some(marks),
            Err(e) => {
                warn!(endpoint = %endpoint_id, error = %e, "could not reload false positives");
                None
            }
        }
    }

    fn persist(
        &self,
        endpoint: &Endpoint,
        results: &[TestResult],
        summary: RunSummary,
        phase: RunPhase,
        finished_at: DateTime<Utc>,
    ) {
        if let Err(e) = self.store.save_test_results(&endpoint.id, results) {
            warn!(endpoint = %endpoint.id, error = %e, "failed to save test results");
        }

        let entry = HistoryEntry {
            endpoint_id: endpoint.id.clone(),
            method: endpoint.method,
            path: endpoint.path.clone(),
            timestamp: finished_at,
            summary,
            phase,
        };
        if let Err(e) = self.store.record_history(entry) {
            warn!(endpoint = %endpoint.id, error = %e, "failed to record run history");
        }

        if phase == RunPhase::Completed {
            if let Err(e) = self.touch_projects(&endpoint.id, finished_at) {
                warn!(endpoint = %endpoint.id, error = %e, "failed to update project");
            }
        }
    }

    /// Stamp `last_tested_at` on every project that owns the endpoint.
    fn touch_projects(&self, endpoint_id: &str, at: DateTime<Utc>) -> Result<()> {
        for mut project in self.store.load_projects()? {
            if project.endpoint_ids.iter().any(|id| id == endpoint_id) {
                project.last_tested_at = Some(at);
                self.store.save_project(&project)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Parameter, ParameterLocation, Schema, SchemaType};
    use crate::probe::{Outcome, ProbeRequest, ProbeResponse, Transport, TransportError};
    use crate::rules::RuleId;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers each probe with the next status in the script, repeating the
    /// last one.
    struct ScriptedTransport {
        statuses: Vec<u16>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(statuses: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                statuses: statuses.to_vec(),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: &ProbeRequest,
        ) -> std::result::Result<ProbeResponse, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(request.url.to_string());
            let status = self.statuses[n.min(self.statuses.len() - 1)];
            Ok(ProbeResponse { status })
        }
    }

    type Hook = Box<dyn Fn(usize) + Send + Sync>;

    /// Returns immediately, records each requested delay and optionally runs
    /// a hook with the 1-based call number.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
        hook: Option<Hook>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            let n = {
                let mut delays = self.delays.lock().unwrap();
                delays.push(duration);
                delays.len()
            };
            if let Some(hook) = &self.hook {
                hook(n);
            }
        }
    }

    fn users_by_id() -> Endpoint {
        Endpoint {
            id: Endpoint::identity(HttpMethod::Get, "/users/{id}"),
            method: HttpMethod::Get,
            path: "/users/{id}".into(),
            summary: String::new(),
            description: String::new(),
            tags: vec![],
            parameters: vec![Parameter {
                name: "id".into(),
                location: ParameterLocation::Path,
                required: true,
                schema: Schema::of_type(SchemaType::Integer),
                description: String::new(),
            }],
            request_body: None,
            responses: vec![],
            security: vec![],
        }
    }

    fn controller(
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStore>,
        sleeper: Arc<RecordingSleeper>,
    ) -> RunController {
        RunController::new(
            Executor::new(transport),
            Arc::new(RuleEngine::new()),
            store,
        )
        .with_sleeper(sleeper)
    }

    fn no_string() -> RuleSelection {
        RuleSelection::enabled(&[RuleId::NoString])
    }

    #[tokio::test]
    async fn completes_in_order_with_pacing() {
        let transport = ScriptedTransport::new(&[400]);
        let store = Arc::new(MemoryStore::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let ctl = controller(transport.clone(), store.clone(), sleeper.clone());

        let report = ctl.start(&users_by_id(), &no_string(), "http://h").await.unwrap();

        assert_eq!(report.phase, RunPhase::Completed);
        assert_eq!(report.results.len(), 6);
        assert!(report.results.iter().all(|r| r.outcome == Outcome::Pass));
        let ids: Vec<String> = report.results.iter().map(|r| r.id.clone()).collect();
        let expected: Vec<String> = (0..6)
            .map(|i| format!("GET__users_id_NO_STRING_id_{i}"))
            .collect();
        assert_eq!(ids, expected);
        assert_eq!(transport.urls.lock().unwrap()[0], "http://h/users/abc");
        assert_eq!(*sleeper.delays.lock().unwrap(), vec![TEST_DELAY; 6]);

        let state = ctl.handle().snapshot();
        assert_eq!(state.completed, 6);
        assert_eq!(state.total, 6);
        assert_eq!(state.current_test, None);
        assert_eq!(ctl.handle().progress_percentage(), 100);

        assert_eq!(store.load_test_results(&report.endpoint_id).unwrap().len(), 6);
        let history = store.load_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary.passed, 6);
        assert_eq!(history[0].phase, RunPhase::Completed);
    }

    #[tokio::test]
    async fn stop_takes_effect_before_next_case() {
        let transport = ScriptedTransport::new(&[200]);
        let store = Arc::new(MemoryStore::new());
        let handle_slot: Arc<Mutex<Option<RunHandle>>> = Arc::default();
        let slot = handle_slot.clone();
        let sleeper = Arc::new(RecordingSleeper {
            hook: Some(Box::new(move |n| {
                if n == 2 {
                    if let Some(h) = slot.lock().unwrap().as_ref() {
                        h.stop();
                    }
                }
            })),
            ..Default::default()
        });
        let ctl = controller(transport.clone(), store.clone(), sleeper);
        *handle_slot.lock().unwrap() = Some(ctl.handle());

        let report = ctl.start(&users_by_id(), &no_string(), "http://h").await.unwrap();

        assert_eq!(report.phase, RunPhase::Stopped);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.planned, 6);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.summary.failed, 2);
        assert_eq!(store.load_test_results(&report.endpoint_id).unwrap().len(), 2);
        assert_eq!(store.load_history().unwrap()[0].phase, RunPhase::Stopped);
    }

    #[tokio::test]
    async fn pause_suspends_until_resume() {
        let transport = ScriptedTransport::new(&[422]);
        let store = Arc::new(MemoryStore::new());
        let handle_slot: Arc<Mutex<Option<RunHandle>>> = Arc::default();
        let slot = handle_slot.clone();
        let sleeper = Arc::new(RecordingSleeper {
            hook: Some(Box::new(move |n| {
                if n == 1 {
                    if let Some(h) = slot.lock().unwrap().as_ref() {
                        h.pause();
                    }
                }
            })),
            ..Default::default()
        });
        let ctl = controller(transport.clone(), store, sleeper);
        let handle = ctl.handle();
        *handle_slot.lock().unwrap() = Some(handle.clone());
        let endpoint = users_by_id();
        let selection = no_string();

        let observer = async {
            let mut rx = handle.subscribe();
            rx.wait_for(|p| *p == RunPhase::Paused).await.unwrap();
            // Let the loop reach its pause check.
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            let state = handle.snapshot();
            assert_eq!(state.completed, 1);
            assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
            assert_eq!(handle.results().len(), state.completed);
            assert!(handle.resume());
        };

        let (report, ()) = tokio::join!(ctl.start(&endpoint, &selection, "http://h"), observer);
        let report = report.unwrap();
        assert_eq!(report.phase, RunPhase::Completed);
        assert_eq!(report.results.len(), 6);
    }

    #[tokio::test]
    async fn second_start_while_active_is_rejected() {
        let transport = ScriptedTransport::new(&[400]);
        let store = Arc::new(MemoryStore::new());
        let handle_slot: Arc<Mutex<Option<RunHandle>>> = Arc::default();
        let slot = handle_slot.clone();
        let sleeper = Arc::new(RecordingSleeper {
            hook: Some(Box::new(move |n| {
                if n == 1 {
                    if let Some(h) = slot.lock().unwrap().as_ref() {
                        h.pause();
                    }
                }
            })),
            ..Default::default()
        });
        let ctl = controller(transport, store, sleeper);
        let handle = ctl.handle();
        *handle_slot.lock().unwrap() = Some(handle.clone());
        let endpoint = users_by_id();
        let selection = no_string();

        let intruder = async {
            let mut rx = handle.subscribe();
            rx.wait_for(|p| *p == RunPhase::Paused).await.unwrap();
            let second = ctl.start(&endpoint, &selection, "http://h").await;
            assert!(matches!(second, Err(ProbeError::RunInProgress)));
            assert!(handle.stop());
        };

        let (report, ()) = tokio::join!(ctl.start(&endpoint, &selection, "http://h"), intruder);
        let report = report.unwrap();
        assert_eq!(report.phase, RunPhase::Stopped);
        assert_eq!(report.results.len(), 1);
    }

    #[tokio::test]
    async fn false_positives_are_skipped_and_counted_as_passed() {
        let transport = ScriptedTransport::new(&[200]);
        let store = Arc::new(MemoryStore::new());
        let endpoint = users_by_id();
        store
            .save_false_positive(&endpoint.id, "GET__users_id_NO_STRING_id_0", "numeric strings ok")
            .unwrap();
        let ctl = controller(transport, store.clone(), Arc::default());

        let report = ctl.start(&endpoint, &no_string(), "http://h").await.unwrap();
        assert_eq!(report.planned, 5);
        assert_eq!(report.summary.failed, 5);

        // Marking one of this run's failures afterwards moves it to passed.
        store
            .save_false_positive(&endpoint.id, "GET__users_id_NO_STRING_id_1", "accepted")
            .unwrap();
        let marks = store.load_false_positives().unwrap();
        let recount = RunSummary::from_results(&report.results, &marks);
        assert_eq!((recount.passed, recount.failed), (1, 4));

        let report = ctl.start(&endpoint, &no_string(), "http://h").await.unwrap();
        assert_eq!(report.planned, 4);

        store
            .remove_false_positive(&endpoint.id, "GET__users_id_NO_STRING_id_0")
            .unwrap();
        let report = ctl.start(&endpoint, &no_string(), "http://h").await.unwrap();
        assert_eq!(report.planned, 5);
        assert_eq!(report.failed_tests().len(), 5);
    }

    #[tokio::test]
    async fn completed_run_stamps_owning_project() {
        let transport = ScriptedTransport::new(&[400]);
        let store = Arc::new(MemoryStore::new());
        let endpoint = users_by_id();
        let project = crate::store::tests::project("http://api/doc.json", &[&endpoint.id]);
        store.save_project(&project).unwrap();
        let ctl = controller(transport, store.clone(), Arc::default());

        ctl.start(&endpoint, &no_string(), "http://h").await.unwrap();
        let stamped = store.get_project(&project.id).unwrap().unwrap();
        assert!(stamped.last_tested_at.is_some());
    }
}
