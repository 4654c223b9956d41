//! Optimizer discovery, launch, and run orchestration.
//!
//! The pieces compose in launch order: [`find_dakota`] locates the
//! executable, [`DakotaCommand`] assembles its invocation for the run's
//! restart policy, and [`DakotaSession`] ties problem loading, control-file
//! generation, and either a foreground launch or a queued
//! [`JobRunner`] submission into one run lifecycle.

pub mod command;
pub mod discovery;
pub mod launcher;
pub mod queue;
pub mod session;

pub use command::{DakotaCommand, MPI_LAUNCHER};
pub use discovery::{find_dakota, DakotaInstall, ToolVersion, DAKOTA_EXE_ENV, MIN_DAKOTA_VERSION};
pub use launcher::launch_foreground;
pub use queue::{
    remove_stale_run_db, wait_for_completion, JobDescription, JobId, JobRunner, LocalJobRunner,
    WaitOptions, DEFAULT_WAIT_POLL,
};
pub use session::DakotaSession;

/// Serializes tests that touch process-wide environment variables.
#[cfg(test)]
pub(crate) fn tests_env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
