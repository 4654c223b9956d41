//! Direct-driver re-entry and the watcher-mode placeholder script.
//!
//! In direct-driver mode the optimizer forks `dakota_driver.sh` once per
//! evaluation with the tagged parameter and results paths as arguments; the
//! script re-enters the orchestrating program, which calls [`run_driver`].
//! In watcher mode the forked script is `dummy_driver.sh`, which only holds
//! the synchronous interface open until the watcher has written results.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use dak_types::{
    resolve_factory, DakResult, EvaluationError, ProblemRegistry, DRIVER_SCRIPT,
    PLACEHOLDER_SCRIPT,
};

use crate::exchange::{ParamsFile, ResultsFile};

/// Attempts the placeholder makes while waiting for the results file.
const PLACEHOLDER_ATTEMPTS: u32 = 40;

/// Seconds between placeholder attempts.
const PLACEHOLDER_SLEEP_SECS: &str = "0.25";

/// Write the direct-driver re-entry script into the output directory.
///
/// The optimizer appends the parameter- and results-file paths when it forks
/// the script; `program` is re-entered in `drive` mode with both.
pub fn write_driver_script(
    out_dir: &Path,
    program: &Path,
    manifest: &Path,
) -> DakResult<PathBuf> {
    let path = out_dir.join(DRIVER_SCRIPT);
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("# Autogenerated by daklink\n");
    script.push_str(&format!(
        "exec '{}' drive --problem '{}' \"$1\" \"$2\"\n",
        program.display(),
        manifest.display()
    ));
    write_script(&path, &script)?;
    info!(path = %path.display(), "wrote driver re-entry script");
    Ok(path)
}

/// Write the watcher-mode placeholder script into the output directory.
///
/// The script waits for its second argument (the results file) to appear,
/// giving the in-process watcher time to evaluate before the optimizer's
/// synchronous fork returns.
pub fn write_placeholder_script(out_dir: &Path) -> DakResult<PathBuf> {
    let path = out_dir.join(PLACEHOLDER_SCRIPT);
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str("# Autogenerated by daklink\n");
    script.push_str("n=0\n");
    script.push_str(&format!(
        "while [ \"$n\" -lt {PLACEHOLDER_ATTEMPTS} ] && [ ! -e \"$2\" ]; do\n"
    ));
    script.push_str(&format!("  sleep {PLACEHOLDER_SLEEP_SECS}\n"));
    script.push_str("  n=$((n+1))\n");
    script.push_str("done\n");
    script.push_str(&format!("if [ \"$n\" -eq {PLACEHOLDER_ATTEMPTS} ]; then\n"));
    script.push_str("  echo \"results file $2 never appeared\"\n");
    script.push_str("fi\n");
    write_script(&path, &script)?;
    info!(path = %path.display(), "wrote placeholder driver script");
    Ok(path)
}

/// One forked evaluation: resolve the problem, read the parameter file,
/// evaluate, write the results file.
///
/// Every invocation is a fresh process; no state is shared between
/// evaluations. An error here exits the subprocess non-zero, which the
/// optimizer's fork interface treats as a failed evaluation.
pub fn run_driver(
    registry: &ProblemRegistry,
    manifest: &Path,
    params_path: &Path,
    results_path: &Path,
    verbose: bool,
) -> DakResult<f64> {
    let params = ParamsFile::read(params_path)?;
    let values = params.values();
    debug!(
        params = %params_path.display(),
        variables = values.len(),
        "driver evaluation requested"
    );

    let factory = resolve_factory(registry, manifest)?;
    let problem = factory.build(values.clone(), verbose)?;
    if values.len() != problem.nx() {
        return Err(EvaluationError::DimensionMismatch {
            path: params_path.display().to_string(),
            expected: problem.nx(),
            actual: values.len(),
        }
        .into());
    }

    let objective = problem.evaluate(&values)?;
    ResultsFile::write(results_path, objective)?;
    info!(
        problem = factory.name(),
        objective,
        results = %results_path.display(),
        "driver evaluation complete"
    );
    Ok(objective)
}

fn write_script(path: &Path, content: &str) -> DakResult<()> {
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dak_types::{DakError, OptimizationProblem, ProblemFactory};

    struct Sphere {
        x0: Vec<f64>,
    }

    impl OptimizationProblem for Sphere {
        fn nx(&self) -> usize {
            self.x0.len()
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
            Ok(Box::new(Sphere { x0 }))
        }
    }

    struct FailingFactory;

    impl ProblemFactory for FailingFactory {
        fn name(&self) -> &str {
            "failing"
        }

        fn build(&self, x0: Vec<f64>, _verbose: bool) -> DakResult<Box<dyn OptimizationProblem>> {
            struct Failing {
                nx: usize,
            }
            impl OptimizationProblem for Failing {
                fn nx(&self) -> usize {
                    self.nx
                }
                fn evaluate(&self, _x: &[f64]) -> DakResult<f64> {
                    Err(dak_types::EvaluationError::ObjectiveFailed {
                        message: "synthetic failure".into(),
                    }
                    .into())
                }
            }
            Ok(Box::new(Failing { nx: x0.len() }))
        }
    }

    fn setup(dir: &tempfile::TempDir, factory_name: &str) -> (ProblemRegistry, PathBuf) {
        let mut registry = ProblemRegistry::new();
        match factory_name {
            "sphere" => registry.register(Box::new(SphereFactory)).unwrap(),
            _ => registry.register(Box::new(FailingFactory)).unwrap(),
        };
        let manifest = dir.path().join("problem.json");
        std::fs::write(&manifest, format!(r#"{{"problem": "{factory_name}"}}"#)).unwrap();
        (registry, manifest)
    }

    fn write_params(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("params.in.1");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn driver_script_re_enters_program() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_driver_script(
            dir.path(),
            Path::new("/usr/local/bin/daklink"),
            Path::new("/tmp/run1/problem.json"),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("dakota_driver.sh"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh"));
        assert!(content.contains("drive --problem '/tmp/run1/problem.json'"));
        assert!(content.contains("\"$1\" \"$2\""));
    }

    #[test]
    fn placeholder_script_waits_for_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_placeholder_script(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("dummy_driver.sh"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("-lt 40"));
        assert!(content.contains("sleep 0.25"));
        assert!(content.contains("$2"));
    }

    #[cfg(unix)]
    #[test]
    fn scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = write_placeholder_script(dir.path()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn run_driver_evaluates_and_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, manifest) = setup(&dir, "sphere");
        let params = write_params(&dir, "2 variables\n3.0 x1\n4.0 x2\n1 functions\n");
        let results = dir.path().join("results.out.1");

        let objective = run_driver(&registry, &manifest, &params, &results, false).unwrap();
        assert_eq!(objective, 25.0);

        let written = ResultsFile::read(&results).unwrap();
        assert!((written - 25.0).abs() < 1e-12);
    }

    #[test]
    fn run_driver_surfaces_objective_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, manifest) = setup(&dir, "failing");
        let params = write_params(&dir, "1 variables\n1.0 x1\n");
        let results = dir.path().join("results.out.1");

        let err = run_driver(&registry, &manifest, &params, &results, false).unwrap_err();
        assert!(matches!(err, DakError::Evaluation(_)));
        assert!(!results.exists(), "no results file on failure");
    }

    #[test]
    fn run_driver_rejects_dimension_mismatch() {
        struct TwoDim;
        impl OptimizationProblem for TwoDim {
            fn nx(&self) -> usize {
                2
            }
            fn evaluate(&self, x: &[f64]) -> DakResult<f64> {
                Ok(x[0] + x[1])
            }
        }
        struct TwoDimFactory;
        impl ProblemFactory for TwoDimFactory {
            fn name(&self) -> &str {
                "two_dim"
            }
            fn build(
                &self,
                _x0: Vec<f64>,
                _verbose: bool,
            ) -> DakResult<Box<dyn OptimizationProblem>> {
                Ok(Box::new(TwoDim))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut registry = ProblemRegistry::new();
        registry.register(Box::new(TwoDimFactory)).unwrap();
        let manifest = dir.path().join("problem.json");
        std::fs::write(&manifest, r#"{"problem": "two_dim"}"#).unwrap();

        let params = write_params(&dir, "3 variables\n1.0 x1\n2.0 x2\n3.0 x3\n");
        let err = run_driver(
            &registry,
            &manifest,
            &params,
            &dir.path().join("results.out.1"),
            false,
        )
        .unwrap_err();
        match err {
            DakError::Evaluation(dak_types::EvaluationError::DimensionMismatch {
                expected,
                actual,
                ..
            }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected DimensionMismatch, got {other}"),
        }
    }

    #[test]
    fn run_driver_rejects_missing_params() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, manifest) = setup(&dir, "sphere");

        let err = run_driver(
            &registry,
            &manifest,
            &dir.path().join("absent.in"),
            &dir.path().join("results.out"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, DakError::Io(_)));
    }
}
