//! Optimization problem contract and the factory registry that resolves it.

use std::fmt;

use tracing::debug;

use crate::errors::{ConfigurationError, DakResult};

/// A user-supplied objective function over a fixed number of continuous
/// design variables.
///
/// Instances are built once per run by their [`ProblemFactory`] and keep an
/// immutable identity for the run's duration.
pub trait OptimizationProblem: Send + Sync {
    /// Number of continuous design variables (>= 1).
    fn nx(&self) -> usize;

    /// Evaluate the objective at `x`, where `x.len()` equals [`nx`](Self::nx).
    fn evaluate(&self, x: &[f64]) -> DakResult<f64>;
}

impl fmt::Debug for dyn OptimizationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizationProblem")
            .field("nx", &self.nx())
            .finish_non_exhaustive()
    }
}

/// Builds [`OptimizationProblem`] instances from a run's initial point.
pub trait ProblemFactory: Send + Sync {
    /// Registry name, referenced by problem manifests.
    fn name(&self) -> &str;

    /// Construct the problem with the run's initial point and verbosity flag.
    fn build(&self, x0: Vec<f64>, verbose: bool) -> DakResult<Box<dyn OptimizationProblem>>;
}

/// Explicit registration of problem factories.
///
/// A run resolves its problem against what was registered here; ambiguity
/// (zero or several candidates with no explicit selection) is a configuration
/// error at load time, never a silent first match.
#[derive(Default)]
pub struct ProblemRegistry {
    factories: Vec<Box<dyn ProblemFactory>>,
}

impl ProblemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. Duplicate names are rejected.
    pub fn register(&mut self, factory: Box<dyn ProblemFactory>) -> DakResult<()> {
        if self.factories.iter().any(|f| f.name() == factory.name()) {
            return Err(ConfigurationError::DuplicateProblem {
                name: factory.name().to_string(),
            }
            .into());
        }
        debug!(problem = factory.name(), "registered problem factory");
        self.factories.push(factory);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Names of all registered factories, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<&dyn ProblemFactory> {
        self.factories
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /// The single registered factory, if exactly one exists.
    pub fn sole(&self) -> Option<&dyn ProblemFactory> {
        match self.factories.as_slice() {
            [only] => Some(only.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DakError;

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

    struct SphereFactory {
        name: String,
    }

    impl ProblemFactory for SphereFactory {
        fn name(&self) -> &str {
            &self.name
        }

        fn build(&self, x0: Vec<f64>, _verbose: bool) -> DakResult<Box<dyn OptimizationProblem>> {
            Ok(Box::new(Sphere { x0 }))
        }
    }

    fn factory(name: &str) -> Box<dyn ProblemFactory> {
        Box::new(SphereFactory { name: name.into() })
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ProblemRegistry::new();
        registry.register(factory("sphere")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("sphere").is_some());
        assert!(registry.get("rosenbrock").is_none());
        assert_eq!(registry.names(), vec!["sphere"]);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ProblemRegistry::new();
        registry.register(factory("sphere")).unwrap();

        let err = registry.register(factory("sphere")).unwrap_err();
        match err {
            DakError::Configuration(ConfigurationError::DuplicateProblem { name }) => {
                assert_eq!(name, "sphere");
            }
            other => panic!("expected DuplicateProblem, got {other}"),
        }
    }

    #[test]
    fn sole_requires_exactly_one() {
        let mut registry = ProblemRegistry::new();
        assert!(registry.sole().is_none());

        registry.register(factory("sphere")).unwrap();
        assert_eq!(registry.sole().map(|f| f.name()), Some("sphere"));

        registry.register(factory("rosenbrock")).unwrap();
        assert!(registry.sole().is_none());
    }

    #[test]
    fn factory_builds_evaluable_problem() {
        let mut registry = ProblemRegistry::new();
        registry.register(factory("sphere")).unwrap();

        let problem = registry
            .get("sphere")
            .unwrap()
            .build(vec![1.0, 2.0], false)
            .unwrap();
        assert_eq!(problem.nx(), 2);
        assert_eq!(problem.evaluate(&[3.0, 4.0]).unwrap(), 25.0);
    }
}
