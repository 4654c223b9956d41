//! Queue-style submission and completion polling.
//!
//! The external workflow runner is modeled as the [`JobRunner`] trait: submit
//! a job, ask whether its process tree is still running, cancel it.
//! [`LocalJobRunner`] is the reference implementation backed by plain child
//! processes. [`wait_for_completion`] is the synchronous poll that replaces
//! the original busy event loop, with timeout and cancellation support and a
//! per-cycle pump hook for the watcher.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dak_bridge::StopHandle;
use dak_types::{DakResult, LaunchError, RUN_DB_FILE};

use crate::discovery::ToolVersion;

/// Interval between job-tree polls.
pub const DEFAULT_WAIT_POLL: Duration = Duration::from_millis(50);

/// Identifier handed back by a [`JobRunner`] submission.
pub type JobId = Uuid;

/// What a queued launch runs, with which tool, and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub run_dir: PathBuf,

    /// Tool the job depends on, with the minimum acceptable version.
    pub tool: Option<String>,
    pub tool_version: Option<ToolVersion>,
}

impl JobDescription {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<PathBuf>,
        run_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            run_dir: run_dir.into(),
            tool: None,
            tool_version: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>, version: Option<ToolVersion>) -> Self {
        self.tool = Some(tool.into());
        self.tool_version = version;
        self
    }
}

/// Submission and polling surface of the external queue runner.
pub trait JobRunner: Send {
    fn submit(&mut self, job: JobDescription) -> DakResult<JobId>;

    /// Whether any process in the job's tree is still running.
    fn is_tree_running(&mut self, id: &JobId) -> DakResult<bool>;

    fn cancel(&mut self, id: &JobId) -> DakResult<()>;
}

/// Reference [`JobRunner`] backed by local child processes.
#[derive(Default)]
pub struct LocalJobRunner {
    jobs: HashMap<JobId, Child>,
}

impl LocalJobRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRunner for LocalJobRunner {
    fn submit(&mut self, job: JobDescription) -> DakResult<JobId> {
        let child = Command::new(&job.program)
            .args(&job.args)
            .current_dir(&job.run_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaunchError::SubmissionFailed {
                message: format!("{}: {e}", job.program.display()),
            })?;

        let id = JobId::new_v4();
        info!(job = %job.name, id = %id, pid = child.id(), "submitted local job");
        self.jobs.insert(id, child);
        Ok(id)
    }

    fn is_tree_running(&mut self, id: &JobId) -> DakResult<bool> {
        let child = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| LaunchError::JobNotFound {
                job_id: id.to_string(),
            })?;
        match child.try_wait()? {
            Some(status) => {
                debug!(id = %id, code = ?status.code(), "local job exited");
                Ok(false)
            }
            None => Ok(true),
        }
    }

    fn cancel(&mut self, id: &JobId) -> DakResult<()> {
        if let Some(mut child) = self.jobs.remove(id) {
            let _ = child.kill();
            let _ = child.wait();
            info!(id = %id, "cancelled local job");
        }
        Ok(())
    }
}

/// Controls for [`wait_for_completion`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
    pub cancel: Option<StopHandle>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_WAIT_POLL,
            timeout: None,
            cancel: None,
        }
    }
}

/// Block until the runner reports the job tree no longer running.
///
/// Each cycle runs the `pump` callback first (watcher mode drives its
/// parameter poll here), then checks cancellation and the deadline. A pump
/// error, a cancellation, or a timeout attempts a job cancel before
/// returning.
pub fn wait_for_completion<F>(
    runner: &mut dyn JobRunner,
    id: &JobId,
    options: &WaitOptions,
    mut pump: F,
) -> DakResult<()>
where
    F: FnMut() -> DakResult<()>,
{
    let started = Instant::now();
    info!(id = %id, "waiting for job tree to finish");
    loop {
        if let Err(e) = pump() {
            warn!(id = %id, error = %e, "pump failed; cancelling job");
            let _ = runner.cancel(id);
            return Err(e);
        }
        if let Some(cancel) = &options.cancel {
            if cancel.is_stopped() {
                warn!(id = %id, "wait cancelled");
                let _ = runner.cancel(id);
                return Err(LaunchError::Cancelled.into());
            }
        }
        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                let waited_secs = started.elapsed().as_secs();
                warn!(id = %id, waited_secs, "wait timed out");
                let _ = runner.cancel(id);
                return Err(LaunchError::Timeout { waited_secs }.into());
            }
        }
        if !runner.is_tree_running(id)? {
            info!(id = %id, "job tree finished");
            return Ok(());
        }
        std::thread::sleep(options.poll_interval);
    }
}

/// Delete a stale `run.db` left under the output directory by a prior run.
pub fn remove_stale_run_db(out_dir: &Path) -> DakResult<()> {
    let db = out_dir.join(RUN_DB_FILE);
    if db.exists() {
        info!(path = %db.display(), "removing stale run database");
        std::fs::remove_file(&db)?;
    }
    Ok(())
}
