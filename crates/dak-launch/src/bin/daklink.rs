//! daklink CLI.
//!
//! Two entry points share one binary: `run` prepares a run directory and
//! launches the optimizer against it; `drive` is the re-entry mode the
//! generated driver script invokes once per forked evaluation.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dak_bridge::run_driver;
use dak_control::FsuDaceMethod;
use dak_launch::DakotaSession;
use dak_types::{
    DakResult, EvaluationMode, OptimizationProblem, ProblemFactory, ProblemRegistry, RunConfig,
};

/// File-based coupling between an optimization problem and the Dakota
/// optimizer.
#[derive(Parser, Debug)]
#[command(name = "daklink")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prepare a run directory and launch the optimizer against it
    Run(RunArgs),
    /// Perform one forked evaluation (invoked by the generated driver script)
    Drive(DriveArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Output directory for the control file, scripts, and exchange files
    #[arg(long, value_name = "DIR")]
    out_dir: PathBuf,

    /// Problem manifest selecting one of the registered problems
    #[arg(long, value_name = "MANIFEST")]
    problem: PathBuf,

    /// Initial design point, comma separated: --x0 1.0,2.0
    #[arg(long, value_delimiter = ',', value_name = "X0", required = true)]
    x0: Vec<f64>,

    /// Watcher mode: poll for parameter files instead of forking a driver
    #[arg(long)]
    watch: bool,

    /// Node count; more than one launches through mpirun
    #[arg(long, default_value_t = 1)]
    nodes: usize,

    /// Core count bounding direct-driver evaluation concurrency
    #[arg(long, default_value_t = 4)]
    cores: usize,

    /// Sample count for the sampling method
    #[arg(long, default_value_t = 10)]
    samples: usize,

    /// Random seed for the sampling method
    #[arg(long)]
    seed: Option<u64>,

    /// Continue from a prior run's restart file
    #[arg(long, value_name = "RST")]
    restart: Option<PathBuf>,

    /// Verbose problem construction
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct DriveArgs {
    /// Problem manifest selecting one of the registered problems
    #[arg(long, value_name = "MANIFEST")]
    problem: PathBuf,

    /// Parameter file written by the optimizer
    params: PathBuf,

    /// Results file this evaluation writes
    results: PathBuf,

    /// Verbose problem construction
    #[arg(short, long)]
    verbose: bool,
}

/// Built-in quadratic bowl; dimension follows the initial point.
struct Quadratic {
    nx: usize,
}

impl OptimizationProblem for Quadratic {
    fn nx(&self) -> usize {
        self.nx
    }

    fn evaluate(&self, x: &[f64]) -> DakResult<f64> {
        Ok(x.iter().map(|v| v * v).sum())
    }
}

struct QuadraticFactory;

impl ProblemFactory for QuadraticFactory {
    fn name(&self) -> &str {
        "quadratic"
    }

    fn build(&self, x0: Vec<f64>, _verbose: bool) -> DakResult<Box<dyn OptimizationProblem>> {
        Ok(Box::new(Quadratic { nx: x0.len() }))
    }
}

fn built_in_registry() -> DakResult<ProblemRegistry> {
    let mut registry = ProblemRegistry::new();
    registry.register(Box::new(QuadraticFactory))?;
    Ok(registry)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Run(args) => run_command(args),
        Commands::Drive(args) => drive_command(args),
    }
}

fn run_command(args: RunArgs) -> Result<()> {
    let name = args
        .out_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "run".to_string());

    let mut config = RunConfig::new(&name, &args.out_dir, args.x0)
        .with_problem_file(&args.problem)
        .with_nodes(args.nodes)
        .with_cores(args.cores)
        .with_verbose(args.verbose);
    if args.watch {
        config = config.with_mode(EvaluationMode::Watcher);
    }
    if let Some(restart) = &args.restart {
        config = config.with_restart_file(restart);
    }

    let mut method = FsuDaceMethod::default().with_samples(args.samples);
    if let Some(seed) = args.seed {
        method = method.with_seed(seed);
    }

    let registry = built_in_registry()?;
    let mut session = DakotaSession::new(config, &registry, Box::new(method))?;
    session.prepare()?;
    let outcome = session.run()?;

    println!("Run completed in {}", session.config().out_dir.display());
    println!("  tabular history: {}", outcome.tabular_file.display());
    println!("  restart written: {}", outcome.restart_written.display());
    if let Some(code) = outcome.exit_code {
        println!("  optimizer exit code: {code}");
    }
    if outcome.evaluations > 0 {
        println!("  watcher evaluations: {}", outcome.evaluations);
    }
    Ok(())
}

fn drive_command(args: DriveArgs) -> Result<()> {
    let registry = built_in_registry()?;
    run_driver(
        &registry,
        &args.problem,
        &args.params,
        &args.results,
        args.verbose,
    )?;
    Ok(())
}
