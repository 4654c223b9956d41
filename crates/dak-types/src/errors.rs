use thiserror::Error;

/// Main error type for the daklink system
#[derive(Error, Debug)]
pub enum DakError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Problem definition not found: {path}")]
    DefinitionNotFound { path: String },

    #[error("No problem factory is registered; manifest {path} cannot be resolved")]
    NoProblemRegistered { path: String },

    #[error("Problem '{name}' requested by {path} is not registered")]
    ProblemNotRegistered { path: String, name: String },

    #[error("Manifest {path} selects no problem and {count} factories are registered: {candidates}")]
    AmbiguousProblem {
        path: String,
        count: usize,
        candidates: String,
    },

    #[error("Problem factory '{name}' is already registered")]
    DuplicateProblem { name: String },

    #[error("Invalid problem manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },

    #[error("No problem definition configured; {mode} mode cannot evaluate")]
    ProblemRequired { mode: String },

    #[error("No method specialization supplied for the control file's method section")]
    MethodUnimplemented,
}

/// Optimizer executable discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No dakota executable found (require at least version {required})")]
    ExecutableNotFound { required: String },

    #[error("Dakota at {path} reports version {found}, need at least {required}")]
    VersionTooOld {
        path: String,
        found: String,
        required: String,
    },
}

/// Objective-evaluation and exchange-file errors
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Malformed parameter file {path}: {message}")]
    MalformedParams { path: String, message: String },

    #[error("Parameter file {path} carries {actual} variables, problem expects {expected}")]
    DimensionMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Objective function failed: {message}")]
    ObjectiveFailed { message: String },

    #[error("Malformed results file {path}: {message}")]
    MalformedResults { path: String, message: String },
}

/// Optimizer launch and job-monitoring errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Failed to spawn {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("Optimizer exited with status {code:?}")]
    OptimizerFailed { code: Option<i32> },

    #[error("Job submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Timed out after {waited_secs} s waiting for the optimizer job tree")]
    Timeout { waited_secs: u64 },

    #[error("Run cancelled while waiting for the optimizer job tree")]
    Cancelled,
}

/// Result type alias for daklink operations
pub type DakResult<T> = Result<T, DakError>;

/// Helper trait for converting string errors
pub trait IntoDakError {
    fn into_dak_error(self) -> DakError;
}

impl IntoDakError for String {
    fn into_dak_error(self) -> DakError {
        DakError::Internal(self)
    }
}

impl IntoDakError for &str {
    fn into_dak_error(self) -> DakError {
        DakError::Internal(self.to_string())
    }
}

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::errors::DakError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::errors::DakError::Internal(format!($($arg)*))
    };
}
