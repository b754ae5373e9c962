use std::fmt;

use thiserror::Error;

/// Main error type for parameter search
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data contract error: {0}")]
    DataContract(#[from] DataContractError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationFailure),

    #[error("Not fitted: {0}")]
    NotFitted(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Malformed search inputs. Always fatal, never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parameter values should be a list (parameter {parameter})")]
    NotASequence { parameter: String },

    #[error("Parameter values should be a non-empty list (parameter {parameter})")]
    EmptyCandidates { parameter: String },

    #[error("Parameter array should be one-dimensional (parameter {parameter} has {ndim} dimensions)")]
    MultiDimensional { parameter: String, ndim: usize },

    #[error("Parameter array shape {shape:?} does not match {len} values (parameter {parameter})")]
    ShapeMismatch {
        parameter: String,
        shape: Vec<usize>,
        len: usize,
    },

    #[error("Parameter grid should be a mapping or a list of mappings, got {found}")]
    InvalidGrid { found: String },

    #[error("Invalid distribution for {parameter}: {message}")]
    InvalidDistribution { parameter: String, message: String },

    #[error("Cannot use a custom kernel function. Precompute the kernel matrix instead.")]
    CustomKernel,

    #[error("Estimator {estimator} does not support {capability}")]
    MissingCapability {
        estimator: String,
        capability: String,
    },

    #[error("If no scoring is specified, the estimator passed should have a 'score' method. The estimator {estimator} does not.")]
    NoScorer { estimator: String },

    #[error("Unknown scorer: {name}")]
    UnknownScorer { name: String },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("n_jobs == 0 has no meaning")]
    ZeroJobs,

    #[error("Invalid pre_dispatch value: {value}")]
    InvalidPreDispatch { value: String },

    #[error("Cross-validation produced no folds")]
    NoFolds,

    #[error("Parameter space produced no candidates")]
    NoCandidates,

    #[error("Search has already been fitted")]
    AlreadyFitted,
}

/// Inputs or collaborator outputs that break the data contract.
#[derive(Error, Debug)]
pub enum DataContractError {
    #[error("Target variable (y) has a different number of samples ({targets}) than data (X: {samples} samples)")]
    SampleCountMismatch { targets: usize, samples: usize },

    #[error("scoring must return a number, got {value} ({type_name}) instead")]
    NonNumericScore { value: String, type_name: String },

    #[error("X should be a square kernel matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Sample index {index} out of bounds for {n_samples} samples")]
    IndexOutOfBounds { index: usize, n_samples: usize },

    #[error("Matrix of shape {rows}x{cols} cannot hold {len} values")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },

    #[error("No held-out samples for candidate {candidate}")]
    NoTestSamples { candidate: usize },
}

/// Which step of the search a collaborator failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Split,
    Fit,
    Score,
    Refit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split => write!(f, "split"),
            Self::Fit => write!(f, "fit"),
            Self::Score => write!(f, "score"),
            Self::Refit => write!(f, "refit"),
        }
    }
}

/// A model, scorer or fold generator failed while the search was running.
#[derive(Error, Debug)]
pub struct EvaluationFailure {
    pub stage: Stage,
    pub parameters: Option<String>,
    pub fold: Option<usize>,
    #[source]
    pub source: anyhow::Error,
}

impl EvaluationFailure {
    pub fn new(stage: Stage, source: anyhow::Error) -> Self {
        Self {
            stage,
            parameters: None,
            fold: None,
            source,
        }
    }

    pub fn with_parameters(mut self, parameters: impl fmt::Display) -> Self {
        self.parameters = Some(parameters.to_string());
        self
    }

    pub fn with_fold(mut self, fold: usize) -> Self {
        self.fold = Some(fold);
        self
    }
}

impl fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(parameters) = &self.parameters {
            write!(f, " for {parameters}")?;
        }
        if let Some(fold) = self.fold {
            write!(f, " on fold {fold}")?;
        }
        write!(f, ": {}", self.source)
    }
}

/// Result type alias for search operations
pub type GsResult<T> = Result<T, SearchError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SearchError::Internal(format!($($arg)*))
    };
}
