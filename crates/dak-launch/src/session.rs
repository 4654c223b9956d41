//! Run session tying problem loading, control-file generation, and launch
//! together.
//!
//! [`DakotaSession`] mirrors the two-phase flow of setting up a run directory
//! and then starting the optimizer against it. Direct-driver runs launch the
//! optimizer in the foreground; watcher runs submit it through a
//! [`JobRunner`] and pump the parameter watcher while polling the job tree.

use std::path::Path;
use tracing::{error, info};

use dak_bridge::{write_driver_script, write_placeholder_script, ParamsWatcher};
use dak_control::{tabular_file_name, ControlFile, MethodSpec};
use dak_types::{
    internal_error, load_problem, ConfigurationError, DakResult, DiscoveryError, EvaluationMode,
    OptimizationProblem, ProblemRegistry, RunConfig, RunOutcome, RunStatus,
};

use crate::command::DakotaCommand;
use crate::discovery::{find_dakota, DakotaInstall, MIN_DAKOTA_VERSION};
use crate::launcher::launch_foreground;
use crate::queue::{
    remove_stale_run_db, wait_for_completion, JobDescription, JobRunner, LocalJobRunner,
    WaitOptions,
};

fn mode_name(mode: EvaluationMode) -> &'static str {
    match mode {
        EvaluationMode::DirectDriver => "direct-driver",
        EvaluationMode::Watcher => "watcher",
    }
}

/// One optimizer run from configuration to completion.
pub struct DakotaSession {
    config: RunConfig,
    method: Box<dyn MethodSpec>,
    status: RunStatus,
    problem: Option<Box<dyn OptimizationProblem>>,
    nx: Option<usize>,
    watcher: Option<ParamsWatcher>,
    prepared: bool,
}

impl DakotaSession {
    /// Load the configured problem (when a manifest is set) and validate the
    /// initial point against it.
    pub fn new(
        config: RunConfig,
        registry: &ProblemRegistry,
        method: Box<dyn MethodSpec>,
    ) -> DakResult<Self> {
        let problem = load_problem(
            registry,
            config.problem_file.as_deref(),
            &config.x0,
            config.verbose,
        )?;
        let nx = problem.as_ref().map(|p| p.nx());
        let status = RunStatus::new(config.clone());
        Ok(Self {
            config,
            method,
            status,
            problem,
            nx,
            watcher: None,
            prepared: false,
        })
    }

    /// Write the run's artifacts into the output directory: the control file
    /// plus the mode's script (re-entry script for direct-driver, placeholder
    /// script and a registered watcher for watcher mode).
    pub fn prepare(&mut self) -> DakResult<()> {
        self.status.mark_preparing();
        let out_dir = self.config.absolute_out_dir()?;
        std::fs::create_dir_all(&out_dir)?;

        let Some(nx) = self.nx else {
            return Err(ConfigurationError::ProblemRequired {
                mode: mode_name(self.config.mode).to_string(),
            }
            .into());
        };
        ControlFile::new(&self.config, nx)
            .with_method(self.method.as_ref())
            .write()?;

        match self.config.mode {
            EvaluationMode::DirectDriver => {
                let manifest = self
                    .config
                    .problem_file
                    .as_deref()
                    .ok_or_else(|| internal_error!("problem loaded without a manifest path"))?;
                let manifest = std::path::absolute(manifest)?;
                let program = std::env::current_exe()?;
                write_driver_script(&out_dir, &program, &manifest)?;
            }
            EvaluationMode::Watcher => {
                write_placeholder_script(&out_dir)?;
                if self.watcher.is_none() {
                    let problem = self.problem.take().ok_or_else(|| {
                        internal_error!("watcher mode prepared without a problem")
                    })?;
                    self.watcher = Some(ParamsWatcher::new(
                        problem,
                        self.config.params_path()?,
                        self.config.results_path()?,
                    ));
                }
            }
        }

        info!(
            run = %self.config.name,
            mode = mode_name(self.config.mode),
            out_dir = %out_dir.display(),
            "run directory prepared"
        );
        self.prepared = true;
        Ok(())
    }

    /// Run to completion with a [`LocalJobRunner`] for the queued path.
    pub fn run(&mut self) -> DakResult<RunOutcome> {
        let mut runner = LocalJobRunner::new();
        self.run_with_runner(&mut runner)
    }

    /// Run to completion, submitting through `runner` in watcher mode.
    pub fn run_with_runner(&mut self, runner: &mut dyn JobRunner) -> DakResult<RunOutcome> {
        match self.execute(runner) {
            Ok(outcome) => {
                info!(run = %self.config.name, "optimizer run completed");
                self.status.mark_completed(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                error!(run = %self.config.name, error = %e, "optimizer run failed");
                self.status.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    fn execute(&mut self, runner: &mut dyn JobRunner) -> DakResult<RunOutcome> {
        if !self.prepared {
            self.prepare()?;
        }

        let Some(install) = find_dakota(MIN_DAKOTA_VERSION) else {
            error!(
                required = %MIN_DAKOTA_VERSION,
                "no usable optimizer executable; cannot run"
            );
            return Err(DiscoveryError::ExecutableNotFound {
                required: MIN_DAKOTA_VERSION.to_string(),
            }
            .into());
        };

        let out_dir = self.config.absolute_out_dir()?;
        let command = DakotaCommand::new(&self.config)?;
        self.status.mark_running();

        match self.config.mode {
            EvaluationMode::DirectDriver => self.run_foreground(&install, &command, &out_dir),
            EvaluationMode::Watcher => self.run_queued(runner, &install, &command, &out_dir),
        }
    }

    fn run_foreground(
        &self,
        install: &DakotaInstall,
        command: &DakotaCommand,
        out_dir: &Path,
    ) -> DakResult<RunOutcome> {
        let code = launch_foreground(install, command, out_dir, self.config.nodes)?;
        Ok(RunOutcome {
            exit_code: Some(code),
            tabular_file: out_dir.join(tabular_file_name(self.config.is_continuation())),
            restart_written: out_dir.join(command.restart_write()),
            evaluations: 0,
        })
    }

    fn run_queued(
        &mut self,
        runner: &mut dyn JobRunner,
        install: &DakotaInstall,
        command: &DakotaCommand,
        out_dir: &Path,
    ) -> DakResult<RunOutcome> {
        remove_stale_run_db(out_dir)?;

        let (program, args) = command.invocation(&install.exe, self.config.nodes);
        let job = JobDescription::new(&self.config.name, program, out_dir)
            .with_args(args)
            .with_tool("dakota", Some(MIN_DAKOTA_VERSION));
        let id = runner.submit(job)?;

        let mut watcher = self
            .watcher
            .take()
            .ok_or_else(|| internal_error!("watcher mode prepared without a watcher"))?;
        let wait = wait_for_completion(runner, &id, &WaitOptions::default(), || {
            watcher.poll_once().map(|_| ())
        });
        let evaluations = watcher.evaluations();
        self.watcher = Some(watcher);
        wait?;

        Ok(RunOutcome {
            exit_code: None,
            tabular_file: out_dir.join(tabular_file_name(self.config.is_continuation())),
            restart_written: out_dir.join(command.restart_write()),
            evaluations,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Dimension of the loaded problem, when one was loaded.
    pub fn nx(&self) -> Option<usize> {
        self.nx
    }

    /// The parameter watcher, registered by a watcher-mode [`prepare`].
    ///
    /// [`prepare`]: DakotaSession::prepare
    pub fn watcher(&self) -> Option<&ParamsWatcher> {
        self.watcher.as_ref()
    }
}
