//! Method-section specializations.

use serde::{Deserialize, Serialize};

/// Supplies the control file's method block.
///
/// The generator itself knows nothing about search algorithms; rendering a
/// control file without a specialization is a configuration error.
pub trait MethodSpec: Send + Sync {
    /// Dakota keyword naming the method (e.g. "fsu_cvt").
    fn method_name(&self) -> &str;

    /// Render the complete method section, terminated by a blank line.
    fn render(&self) -> String;
}

/// Trial-point placement for the CVT algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CvtTrialType {
    Grid,
    Halton,
    Random,
}

impl CvtTrialType {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Halton => "halton",
            Self::Random => "random",
        }
    }
}

/// FSU design-and-analysis-of-computer-experiments sampling algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FsuDaceAlgorithm {
    Cvt,
    Halton,
    Hammersley,
}

impl FsuDaceAlgorithm {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Cvt => "fsu_cvt",
            Self::Halton => "fsu_halton",
            Self::Hammersley => "fsu_hammersley",
        }
    }
}

/// FSU DACE sampling method options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsuDaceMethod {
    pub algorithm: FsuDaceAlgorithm,

    /// Number of sample points.
    pub samples: usize,

    /// RNG seed; reproducible runs set this.
    pub seed: Option<u64>,

    /// Keep the seed constant across restarts.
    pub fixed_seed: bool,

    /// Latinize the sample set after generation.
    pub latinize: bool,

    /// Emit sample-quality metrics.
    pub quality_metrics: bool,

    /// Variance-based decomposition of the outputs.
    pub variance_based_decomp: bool,

    /// CVT only: trial points per iteration.
    pub num_trials: Option<usize>,

    /// CVT only: how trial points are placed.
    pub trial_type: Option<CvtTrialType>,
}

impl Default for FsuDaceMethod {
    fn default() -> Self {
        Self {
            algorithm: FsuDaceAlgorithm::Cvt,
            samples: 10,
            seed: None,
            fixed_seed: false,
            latinize: false,
            quality_metrics: false,
            variance_based_decomp: false,
            num_trials: None,
            trial_type: None,
        }
    }
}

impl FsuDaceMethod {
    pub fn new(algorithm: FsuDaceAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Sample count, floored at 1.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Seed, floored at 1.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed.max(1));
        self
    }

    pub fn with_fixed_seed(mut self, fixed_seed: bool) -> Self {
        self.fixed_seed = fixed_seed;
        self
    }

    pub fn with_latinize(mut self, latinize: bool) -> Self {
        self.latinize = latinize;
        self
    }

    pub fn with_quality_metrics(mut self, quality_metrics: bool) -> Self {
        self.quality_metrics = quality_metrics;
        self
    }

    pub fn with_variance_based_decomp(mut self, vbd: bool) -> Self {
        self.variance_based_decomp = vbd;
        self
    }

    /// CVT trial configuration, floored at 1 trial.
    pub fn with_trials(mut self, num_trials: usize, trial_type: CvtTrialType) -> Self {
        self.num_trials = Some(num_trials.max(1));
        self.trial_type = Some(trial_type);
        self
    }
}

impl MethodSpec for FsuDaceMethod {
    fn method_name(&self) -> &str {
        self.algorithm.keyword()
    }

    fn render(&self) -> String {
        let mut result = String::new();
        result.push_str("method,\n");
        result.push_str(&format!("        {}\n", self.algorithm.keyword()));
        result.push_str(&format!("          samples = {}\n", self.samples));
        if let Some(seed) = self.seed {
            result.push_str(&format!("          seed = {seed}\n"));
        }
        if self.fixed_seed {
            result.push_str("          fixed_seed\n");
        }
        if self.latinize {
            result.push_str("          latinize\n");
        }
        if self.quality_metrics {
            result.push_str("          quality_metrics\n");
        }
        if self.variance_based_decomp {
            result.push_str("          variance_based_decomp\n");
        }
        if self.algorithm == FsuDaceAlgorithm::Cvt {
            if let Some(num_trials) = self.num_trials {
                result.push_str(&format!("          num_trials = {num_trials}\n"));
            }
            if let Some(trial_type) = self.trial_type {
                result.push_str(&format!("          trial_type = {}\n", trial_type.keyword()));
            }
        }
        result.push('\n');
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_render() {
        let method = FsuDaceMethod::default();
        let block = method.render();

        assert!(block.starts_with("method,\n"));
        assert!(block.contains("fsu_cvt"));
        assert!(block.contains("samples = 10"));
        assert!(!block.contains("seed"));
        assert!(!block.contains("latinize"));
        assert!(block.ends_with("\n\n"));
    }

    #[test]
    fn optional_keywords_render() {
        let method = FsuDaceMethod::default()
            .with_samples(50)
            .with_seed(7)
            .with_fixed_seed(true)
            .with_latinize(true)
            .with_quality_metrics(true)
            .with_variance_based_decomp(true);
        let block = method.render();

        assert!(block.contains("samples = 50"));
        assert!(block.contains("seed = 7"));
        assert!(block.contains("fixed_seed"));
        assert!(block.contains("latinize"));
        assert!(block.contains("quality_metrics"));
        assert!(block.contains("variance_based_decomp"));
    }

    #[test]
    fn samples_and_seed_floored_at_one() {
        let method = FsuDaceMethod::default().with_samples(0).with_seed(0);
        assert_eq!(method.samples, 1);
        assert_eq!(method.seed, Some(1));
    }

    #[test]
    fn trials_only_render_for_cvt() {
        let cvt = FsuDaceMethod::new(FsuDaceAlgorithm::Cvt).with_trials(100, CvtTrialType::Halton);
        assert!(cvt.render().contains("num_trials = 100"));
        assert!(cvt.render().contains("trial_type = halton"));

        let halton =
            FsuDaceMethod::new(FsuDaceAlgorithm::Halton).with_trials(100, CvtTrialType::Halton);
        assert!(halton.render().contains("fsu_halton"));
        assert!(!halton.render().contains("num_trials"));
        assert!(!halton.render().contains("trial_type"));
    }

    #[test]
    fn method_name_tracks_algorithm() {
        assert_eq!(FsuDaceMethod::default().method_name(), "fsu_cvt");
        assert_eq!(
            FsuDaceMethod::new(FsuDaceAlgorithm::Hammersley).method_name(),
            "fsu_hammersley"
        );
    }
}
