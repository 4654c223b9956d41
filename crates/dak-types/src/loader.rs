//! Manifest-based problem loading.
//!
//! A problem manifest is a small JSON file selecting one registered factory:
//!
//! ```json
//! { "problem": "quadratic" }
//! ```
//!
//! The `problem` field may be omitted when exactly one factory is registered.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::{ConfigurationError, DakResult};
use crate::problem::{OptimizationProblem, ProblemFactory, ProblemRegistry};
use crate::validation_error;

/// On-disk problem selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemManifest {
    /// Name of the registered factory to build. Optional when the registry
    /// holds exactly one factory.
    #[serde(default)]
    pub problem: Option<String>,
}

impl ProblemManifest {
    pub fn read(path: &Path) -> DakResult<Self> {
        if !path.exists() {
            return Err(ConfigurationError::DefinitionNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(path)?;
        let manifest = serde_json::from_str(&text).map_err(|e| {
            ConfigurationError::InvalidManifest {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(manifest)
    }

    pub fn write(&self, path: &Path) -> DakResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Resolve the factory a manifest selects.
///
/// Resolution must be unambiguous: the factory the manifest names, or the
/// registry's sole entry when it names none. Zero or several candidates is a
/// configuration error, never a silent first match.
pub fn resolve_factory<'r>(
    registry: &'r ProblemRegistry,
    manifest_path: &Path,
) -> DakResult<&'r dyn ProblemFactory> {
    let manifest = ProblemManifest::read(manifest_path)?;
    let display = manifest_path.display().to_string();

    match manifest.problem.as_deref() {
        Some(name) => {
            registry
                .get(name)
                .ok_or_else(|| ConfigurationError::ProblemNotRegistered {
                    path: display,
                    name: name.to_string(),
                }
                .into())
        }
        None => {
            if registry.is_empty() {
                return Err(ConfigurationError::NoProblemRegistered { path: display }.into());
            }
            registry
                .sole()
                .ok_or_else(|| ConfigurationError::AmbiguousProblem {
                    path: display,
                    count: registry.len(),
                    candidates: registry.names().join(", "),
                }
                .into())
        }
    }
}

/// Load the run's problem, if a manifest path is configured.
///
/// `None` for the path returns `Ok(None)`, valid only when the caller
/// performs no evaluation. After construction the initial point's length is
/// checked against the problem's `nx`.
pub fn load_problem(
    registry: &ProblemRegistry,
    manifest_path: Option<&Path>,
    x0: &[f64],
    verbose: bool,
) -> DakResult<Option<Box<dyn OptimizationProblem>>> {
    let Some(path) = manifest_path else {
        return Ok(None);
    };
    let factory = resolve_factory(registry, path)?;

    let problem = factory.build(x0.to_vec(), verbose)?;
    if x0.len() != problem.nx() {
        return Err(validation_error!(
            "initial point has {} entries, problem '{}' declares nx = {}",
            x0.len(),
            factory.name(),
            problem.nx()
        ));
    }
    info!(
        problem = factory.name(),
        nx = problem.nx(),
        "loaded optimization problem"
    );
    Ok(Some(problem))
}
