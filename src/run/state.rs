use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::probe::TestResult;

/// Lifecycle of a run.
///
/// `Idle -> Running <-> Paused`, `Running | Paused -> Stopped`,
/// `Running -> Completed`. A new run may start from `Idle`, `Stopped` or
/// `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl RunPhase {
    /// A run is in flight (possibly suspended).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Point-in-time view of a run for observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub phase: RunPhase,
    pub completed: usize,
    pub total: usize,
    /// Identity of the test case being executed, if any.
    pub current_test: Option<String>,
}

impl RunState {
    /// Rounded completion percentage, 0 when nothing is planned.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u8
    }
}

#[derive(Debug, Default)]
struct Progress {
    total: usize,
    current_test: Option<String>,
    /// `results.len()` is the completed count.
    results: Vec<TestResult>,
}

/// Shared control and observation handle for one controller.
///
/// Cloning is cheap; every clone sees the same run. `pause`, `resume` and
/// `stop` only flip the phase. The controller loop reacts at its next
/// suspension point.
#[derive(Debug, Clone)]
pub struct RunHandle {
    phase: Arc<watch::Sender<RunPhase>>,
    progress: Arc<Mutex<Progress>>,
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RunHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RunPhase::Idle);
        Self {
            phase: Arc::new(tx),
            progress: Arc::new(Mutex::new(Progress::default())),
        }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Receive every phase change.
    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// `Running -> Paused`. Returns whether the phase changed.
    pub fn pause(&self) -> bool {
        self.transition(|p| (p == RunPhase::Running).then_some(RunPhase::Paused))
    }

    /// `Paused -> Running`. Returns whether the phase changed.
    pub fn resume(&self) -> bool {
        self.transition(|p| (p == RunPhase::Paused).then_some(RunPhase::Running))
    }

    /// `Running | Paused -> Stopped`. Returns whether the phase changed.
    pub fn stop(&self) -> bool {
        self.transition(|p| p.is_active().then_some(RunPhase::Stopped))
    }

    pub fn snapshot(&self) -> RunState {
        let phase = self.phase();
        let progress = self.lock();
        RunState {
            phase,
            completed: progress.results.len(),
            total: progress.total,
            current_test: progress.current_test.clone(),
        }
    }

    pub fn progress_percentage(&self) -> u8 {
        self.snapshot().percentage()
    }

    /// Results recorded so far, in execution order.
    pub fn results(&self) -> Vec<TestResult> {
        self.lock().results.clone()
    }

    /// Atomically claim the handle for a new run. Fails while one is active.
    pub(crate) fn begin(&self, total: usize) -> bool {
        let claimed = self.transition(|p| (!p.is_active()).then_some(RunPhase::Running));
        if claimed {
            let mut progress = self.lock();
            *progress = Progress {
                total,
                ..Progress::default()
            };
        }
        claimed
    }

    /// `Completed` unless the run was stopped. Returns the final phase.
    pub(crate) fn finish(&self) -> RunPhase {
        self.transition(|p| (p != RunPhase::Stopped).then_some(RunPhase::Completed));
        self.lock().current_test = None;
        self.phase()
    }

    pub(crate) fn set_current(&self, test_id: &str) {
        self.lock().current_test = Some(test_id.to_string());
    }

    pub(crate) fn record(&self, result: TestResult) {
        self.lock().results.push(result);
    }

    /// Suspend until the phase leaves `Paused`; returns the new phase.
    pub(crate) async fn wait_while_paused(&self) -> RunPhase {
        let mut rx = self.subscribe();
        let phase = match rx.wait_for(|p| *p != RunPhase::Paused).await {
            Ok(phase) => *phase,
            // Sender dropped.
            Err(_) => RunPhase::Stopped,
        };
        phase
    }

    fn transition(&self, next: impl FnOnce(RunPhase) -> Option<RunPhase>) -> bool {
        let mut changed = None;
        self.phase.send_if_modified(|phase| match next(*phase) {
            Some(to) if to != *phase => {
                changed = Some((*phase, to));
                *phase = to;
                true
            }
            _ => false,
        });
        if let Some((from, to)) = changed {
            info!(from = %from, to = %to, "run phase changed");
        }
        changed.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
