use dak_types::*;
use dak_control::{ControlFile, FsuDaceAlgorithm, FsuDaceMethod};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🌟 daklink Basic Usage Example");

    // Define a problem and a factory for it
    struct Sphere {
        nx: usize,
    }

    impl OptimizationProblem for Sphere {
        fn nx(&self) -> usize {
            self.nx
        }

        fn evaluate(&self, x: &[f64]) -> DakResult<f64> {
            Ok(x.iter().map(|v| v * v).sum())
        }
    }

    struct SphereFactory;

    impl ProblemFactory for SphereFactory {
        fn name(&self) -> &str {
            "sphere"
        }

        fn build(&self, x0: Vec<f64>, _verbose: bool) -> DakResult<Box<dyn OptimizationProblem>> {
            Ok(Box::new(Sphere { nx: x0.len() }))
        }
    }

    // Register it
    let mut registry = ProblemRegistry::new();
    registry.register(Box::new(SphereFactory))?;
    println!("Registered problems: {:?}", registry.names());

    // Describe a run
    let out_dir = tempfile::tempdir()?;
    let manifest_path = out_dir.path().join("problem.json");
    ProblemManifest {
        problem: Some("sphere".to_string()),
    }
    .write(&manifest_path)?;

    let config = RunConfig::new("demo", out_dir.path(), vec![0.5, -0.5])
        .with_problem_file(&manifest_path)
        .with_cores(2)
        .with_verbose(true);
    println!("Run {} writes into {}", config.id, config.out_dir.display());
    println!("Continuation run: {}", config.is_continuation());

    // Build the problem the way the session would
    let problem = load_problem(
        &registry,
        config.problem_file.as_deref(),
        &config.x0,
        config.verbose,
    )?
    .ok_or("expected a problem")?;
    println!("Problem dimension: {}", problem.nx());

    let objective = problem.evaluate(&config.x0)?;
    println!("f(x0) = {objective}");

    // Render the optimizer control file for this run
    let method = FsuDaceMethod::new(FsuDaceAlgorithm::Cvt).with_samples(20);
    let text = ControlFile::new(&config, problem.nx())
        .with_method(&method)
        .render()?;
    println!("Control file is {} lines", text.lines().count());

    // Track the run lifecycle
    let mut status = RunStatus::new(config);
    status.mark_running();
    status.mark_completed(RunOutcome {
        exit_code: Some(0),
        tabular_file: "dakota_tabular_1.dat".into(),
        restart_written: "dakota1.rst".into(),
        evaluations: 20,
    });
    println!("Run finished in state {:?}", status.state);

    // Error handling
    let result: DakResult<()> = Err(ConfigurationError::DuplicateProblem {
        name: "sphere".to_string(),
    }
    .into());

    if let Err(e) = result {
        println!("Error handling works: {}", e);
    }

    println!("✅ All basic functionality working!");

    Ok(())
}
