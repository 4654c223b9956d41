//! Run configuration for a single optimizer coupling session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::errors::DakResult;

/// Control-file name written into the output directory.
pub const CONTROL_FILE: &str = "dakota.in";

/// Parameter-exchange filename.
pub const PARAMS_FILE: &str = "params.in";

/// Results-exchange filename.
pub const RESULTS_FILE: &str = "results.out";

/// Run-database artifact removed before queued submissions.
pub const RUN_DB_FILE: &str = "run.db";

/// Direct-driver re-entry script name.
pub const DRIVER_SCRIPT: &str = "dakota_driver.sh";

/// Watcher-mode placeholder driver script name.
pub const PLACEHOLDER_SCRIPT: &str = "dummy_driver.sh";

/// Unique run identifier.
pub type RunId = Uuid;

/// How optimizer evaluation requests reach the objective function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// The optimizer forks a fresh driver process per evaluation.
    DirectDriver,
    /// A long-lived watcher polls the parameter path and evaluates in place.
    Watcher,
}

impl Default for EvaluationMode {
    fn default() -> Self {
        Self::DirectDriver
    }
}

/// Top-level configuration for one optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub id: RunId,
    pub name: String,

    /// Directory receiving the control file, scripts, and exchange files.
    pub out_dir: PathBuf,

    /// Problem manifest path. `None` is valid only when the run performs no
    /// evaluation.
    pub problem_file: Option<PathBuf>,

    /// Initial design point; length must match the loaded problem's `nx`.
    pub x0: Vec<f64>,

    pub mode: EvaluationMode,

    /// Node count; > 1 launches through the parallel launcher.
    pub nodes: usize,

    /// Core count; bounds evaluation concurrency in direct-driver mode.
    pub cores: usize,

    pub verbose: bool,

    /// A prior run's restart file. Selects the continuation output policy.
    pub restart_file: Option<PathBuf>,

    pub created_at: DateTime<Utc>,
}

impl RunConfig {
    pub fn new(name: &str, out_dir: impl Into<PathBuf>, x0: Vec<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            out_dir: out_dir.into(),
            problem_file: None,
            x0,
            mode: EvaluationMode::DirectDriver,
            nodes: 1,
            cores: 4,
            verbose: false,
            restart_file: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_problem_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.problem_file = Some(path.into());
        self
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_restart_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.restart_file = Some(path.into());
        self
    }

    /// Whether this run continues from a prior run's restart file.
    pub fn is_continuation(&self) -> bool {
        self.restart_file.is_some()
    }

    /// Output directory resolved against the current directory. The watcher
    /// interface and the continuation restart path require absolute paths.
    pub fn absolute_out_dir(&self) -> DakResult<PathBuf> {
        Ok(std::path::absolute(&self.out_dir)?)
    }

    /// Parameter-exchange path under the output directory.
    pub fn params_path(&self) -> DakResult<PathBuf> {
        Ok(self.absolute_out_dir()?.join(PARAMS_FILE))
    }

    /// Results-exchange path under the output directory.
    pub fn results_path(&self) -> DakResult<PathBuf> {
        Ok(self.absolute_out_dir()?.join(RESULTS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RunConfig {
        RunConfig::new("demo", "/tmp/run1", vec![1.0, 2.0])
            .with_cores(8)
            .with_nodes(2)
            .with_verbose(true)
    }

    #[test]
    fn defaults() {
        let config = RunConfig::new("demo", "/tmp/run1", vec![0.0]);
        assert_eq!(config.mode, EvaluationMode::DirectDriver);
        assert_eq!(config.nodes, 1);
        assert_eq!(config.cores, 4);
        assert!(!config.verbose);
        assert!(config.problem_file.is_none());
        assert!(!config.is_continuation());
    }

    #[test]
    fn builders_apply() {
        let config = sample_config()
            .with_mode(EvaluationMode::Watcher)
            .with_problem_file("problem.json")
            .with_restart_file("prior/dakota1.rst");

        assert_eq!(config.mode, EvaluationMode::Watcher);
        assert_eq!(config.nodes, 2);
        assert_eq!(config.cores, 8);
        assert!(config.verbose);
        assert_eq!(config.problem_file.as_deref().unwrap().to_str(), Some("problem.json"));
        assert!(config.is_continuation());
    }

    #[test]
    fn exchange_paths_are_absolute() {
        let config = sample_config();
        let params = config.params_path().unwrap();
        assert!(params.is_absolute());
        assert!(params.ends_with("params.in"));

        let results = config.results_path().unwrap();
        assert!(results.ends_with("results.out"));
    }

    #[test]
    fn serialization_round_trip() {
        let config = sample_config().with_restart_file("dakota1.rst");
        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
