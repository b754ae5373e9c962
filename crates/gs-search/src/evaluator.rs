//! Single-fold evaluation of one configuration.

use std::any::type_name;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use gs_types::{
    select_targets, ConfigError, Configuration, DataContractError, Estimator, EvaluationFailure,
    EvaluationResult, Fold, GsResult, Matrix, Scorer, Stage,
};

/// Train and test data for one fold.
///
/// Pairwise estimators take a square kernel matrix: the training block is
/// `X[train, train]` and the test block is `X[test, train]`.
#[derive(Debug, Clone)]
pub struct Partition {
    pub x_train: Matrix,
    pub y_train: Option<Vec<f64>>,
    pub x_test: Matrix,
    pub y_test: Option<Vec<f64>>,
}

impl Partition {
    pub fn materialize(
        x: &Matrix,
        y: Option<&[f64]>,
        fold: &Fold,
        pairwise: bool,
    ) -> GsResult<Self> {
        let (x_train, x_test) = if pairwise {
            if !x.is_square() {
                return Err(DataContractError::NotSquare {
                    rows: x.n_samples(),
                    cols: x.n_features(),
                }
                .into());
            }
            (
                x.select_block(&fold.train, &fold.train)?,
                x.select_block(&fold.test, &fold.train)?,
            )
        } else {
            (x.select_rows(&fold.train)?, x.select_rows(&fold.test)?)
        };

        let (y_train, y_test) = match y {
            Some(y) => (
                Some(select_targets(y, &fold.train)?),
                Some(select_targets(y, &fold.test)?),
            ),
            None => (None, None),
        };

        Ok(Self {
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    pub fn n_test_samples(&self) -> usize {
        self.x_test.n_samples()
    }
}

/// One (configuration, fold) evaluation task, ready to run.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub candidate: usize,
    pub fold: usize,
    pub configuration: Configuration,
    pub partition: Partition,
}

/// Clones, configures, fits and scores an estimator on one fold.
///
/// The base estimator is only ever cloned; it is never fitted here.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    estimator: &'a dyn Estimator,
    scorer: Arc<dyn Scorer>,
    fit_params: Configuration,
}

impl<'a> Evaluator<'a> {
    pub fn new(estimator: &'a dyn Estimator, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            estimator,
            scorer,
            fit_params: Configuration::new(),
        }
    }

    /// Extra keyword arguments forwarded to every `fit` call.
    pub fn with_fit_params(mut self, fit_params: Configuration) -> Self {
        self.fit_params = fit_params;
        self
    }

    pub fn is_pairwise(&self) -> bool {
        self.estimator.is_pairwise()
    }

    /// Evaluate `configuration` on `fold` of `(x, y)`.
    pub fn evaluate(
        &self,
        configuration: &Configuration,
        fold: &Fold,
        x: &Matrix,
        y: Option<&[f64]>,
    ) -> GsResult<EvaluationResult> {
        let partition = Partition::materialize(x, y, fold, self.is_pairwise())?;
        self.run(WorkUnit {
            candidate: 0,
            fold: 0,
            configuration: configuration.clone(),
            partition,
        })
    }

    pub fn run(&self, unit: WorkUnit) -> GsResult<EvaluationResult> {
        if self.estimator.uses_custom_kernel() {
            return Err(ConfigError::CustomKernel.into());
        }

        let start = Instant::now();
        let WorkUnit {
            candidate,
            fold,
            configuration,
            partition,
        } = unit;

        let mut model = self.estimator.clone_unfitted();
        model
            .set_params(&configuration)
            .map_err(|e| ConfigError::InvalidParameter {
                parameter: configuration.to_string(),
                message: e.to_string(),
            })?;

        model
            .fit(
                &partition.x_train,
                partition.y_train.as_deref(),
                &self.fit_params,
            )
            .map_err(|e| {
                EvaluationFailure::new(Stage::Fit, e)
                    .with_parameters(&configuration)
                    .with_fold(fold)
            })?;

        let score = self
            .scorer
            .score(model.as_ref(), &partition.x_test, partition.y_test.as_deref())
            .map_err(|e| {
                EvaluationFailure::new(Stage::Score, e)
                    .with_parameters(&configuration)
                    .with_fold(fold)
            })?;

        if score.is_nan() {
            return Err(DataContractError::NonNumericScore {
                value: score.to_string(),
                type_name: type_name::<f64>().to_string(),
            }
            .into());
        }

        let n_test_samples = partition.n_test_samples();
        debug!(
            candidate,
            fold,
            score,
            n_test_samples,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "{}",
            configuration
        );

        Ok(EvaluationResult {
            candidate,
            score,
            configuration,
            n_test_samples,
        })
    }
}
