//! Polling parameter watcher.
//!
//! Watcher mode keeps one long-lived process observing the parameter path.
//! Each distinct appearance of the file triggers exactly one evaluation and
//! one results write; the seen-state is cleared when the file disappears so
//! the next appearance is a new event, not a stale re-trigger. The loop
//! assumes at most one evaluation in flight, which holds only under the
//! synchronous interface declared for watcher mode.

use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use dak_types::{DakResult, EvaluationError, OptimizationProblem};

use crate::exchange::{ParamsFile, ResultsFile};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the watcher is in its evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Evaluating,
}

/// Emitted after each completed evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Evaluated { eval: usize, objective: f64 },
}

/// Identity of one parameter-file appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileSignature {
    modified: SystemTime,
    len: u64,
}

/// Stops a [`ParamsWatcher::watch`] loop between polls. Cloneable across
/// threads; never interrupts an evaluation already underway.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Long-lived parameter-path watcher for synchronous-interface runs.
pub struct ParamsWatcher {
    problem: Box<dyn OptimizationProblem>,
    params_path: PathBuf,
    results_path: PathBuf,
    poll_interval: Duration,
    state: WatchState,
    last_seen: Option<FileSignature>,
    evaluations: usize,
    events: Option<Sender<WatchEvent>>,
    stop: StopHandle,
}

impl ParamsWatcher {
    pub fn new(
        problem: Box<dyn OptimizationProblem>,
        params_path: impl Into<PathBuf>,
        results_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            problem,
            params_path: params_path.into(),
            results_path: results_path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: WatchState::Idle,
            last_seen: None,
            evaluations: 0,
            events: None,
            stop: StopHandle::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Emit a [`WatchEvent`] after each evaluation. Best-effort: a full or
    /// disconnected channel is ignored.
    pub fn with_events(mut self, events: Sender<WatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn params_path(&self) -> &Path {
        &self.params_path
    }

    /// One poll step.
    ///
    /// Returns the objective when a new parameter-file appearance was
    /// evaluated, `None` when there was nothing to do. Idle -> Evaluating ->
    /// Idle; an unchanged file never re-fires, a vanished file clears the
    /// seen-state.
    pub fn poll_once(&mut self) -> DakResult<Option<f64>> {
        let Some(signature) = self.signature()? else {
            self.last_seen = None;
            return Ok(None);
        };
        if self.last_seen == Some(signature) {
            return Ok(None);
        }

        self.state = WatchState::Evaluating;
        let outcome = self.evaluate_current();
        self.state = WatchState::Idle;
        let objective = outcome?;

        self.last_seen = Some(signature);
        self.evaluations += 1;
        debug!(
            eval = self.evaluations,
            objective, "watcher evaluation complete"
        );
        if let Some(events) = &self.events {
            let _ = events.try_send(WatchEvent::Evaluated {
                eval: self.evaluations,
                objective,
            });
        }
        Ok(Some(objective))
    }

    /// Blocking loop: poll, sleep, repeat until the stop handle is raised.
    ///
    /// Returns the number of evaluations performed. An evaluation error
    /// aborts the loop and fails the run.
    pub fn watch(&mut self) -> DakResult<usize> {
        info!(
            params = %self.params_path.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "watching parameter path"
        );
        while !self.stop.is_stopped() {
            self.poll_once()?;
            std::thread::sleep(self.poll_interval);
        }
        info!(evaluations = self.evaluations, "parameter watch stopped");
        Ok(self.evaluations)
    }

    fn signature(&self) -> DakResult<Option<FileSignature>> {
        match std::fs::metadata(&self.params_path) {
            Ok(meta) => Ok(Some(FileSignature {
                modified: meta.modified()?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn evaluate_current(&self) -> DakResult<f64> {
        let params = ParamsFile::read(&self.params_path)?;
        let values = params.values();
        if values.len() != self.problem.nx() {
            return Err(EvaluationError::DimensionMismatch {
                path: self.params_path.display().to_string(),
                expected: self.problem.nx(),
                actual: values.len(),
            }
            .into());
        }
        let objective = self.problem.evaluate(&values)?;
        ResultsFile::write(&self.results_path, objective)?;
        Ok(objective)
    }
}
