//! Run lifecycle tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{RunConfig, RunId};

/// Lifecycle state for an optimizer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Preparing,
    Running,
    Completed,
    Failed,
}

/// What a finished launch reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Exit code, when the optimizer ran in the foreground.
    pub exit_code: Option<i32>,

    /// Tabular run-history file requested by the strategy section.
    pub tabular_file: PathBuf,

    /// Restart file this run wrote.
    pub restart_written: PathBuf,

    /// Evaluations performed in-process (watcher mode only; zero otherwise).
    pub evaluations: usize,
}

/// Aggregate status of an optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub config: RunConfig,
    pub state: RunState,
    pub outcome: Option<RunOutcome>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunStatus {
    pub fn new(config: RunConfig) -> Self {
        Self {
            id: config.id,
            config,
            state: RunState::Pending,
            outcome: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_preparing(&mut self) {
        self.state = RunState::Preparing;
    }

    pub fn mark_running(&mut self) {
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, outcome: RunOutcome) {
        self.state = RunState::Completed;
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = RunState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Failed)
    }
}
