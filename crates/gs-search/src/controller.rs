//! The cross-validated search driver.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use gs_types::{
    Capability, ConfigError, Configuration, DataContractError, Estimator, EvaluationFailure,
    FoldGenerator, GsResult, Matrix, SearchError, SearchResult, SearchStatus, Stage,
};

use crate::aggregate::{aggregate, rank};
use crate::config::SearchConfig;
use crate::dispatch::{Dispatcher, ExecutionPool};
use crate::evaluator::Evaluator;
use crate::sampler::ParameterSampler;
use crate::scoring::{resolve_scorer, ScorerRegistry, ScoringOptions};
use crate::space::{ParameterGrid, ParameterSpace};

/// Exhaustive or randomized hyperparameter search with cross-validation.
///
/// A search is fitted once. Each configuration of the parameter space is
/// evaluated on every fold, the fold scores are averaged, and the best
/// configuration is optionally retrained on the whole dataset.
#[derive(Debug)]
pub struct SearchCv {
    estimator: Box<dyn Estimator>,
    space: ParameterSpace,
    cv: Arc<dyn FoldGenerator>,
    config: SearchConfig,
    scoring: ScoringOptions,
    registry: ScorerRegistry,
    fit_params: Configuration,
    status: SearchStatus,
    result: Option<SearchResult>,
}

impl SearchCv {
    pub fn new(
        estimator: Box<dyn Estimator>,
        space: impl Into<ParameterSpace>,
        cv: Arc<dyn FoldGenerator>,
    ) -> Self {
        Self {
            estimator,
            space: space.into(),
            cv,
            config: SearchConfig::default(),
            scoring: ScoringOptions::default(),
            registry: ScorerRegistry::default(),
            fit_params: Configuration::new(),
            status: SearchStatus::new(),
            result: None,
        }
    }

    pub fn grid(
        estimator: Box<dyn Estimator>,
        grid: ParameterGrid,
        cv: Arc<dyn FoldGenerator>,
    ) -> Self {
        Self::new(estimator, grid, cv)
    }

    pub fn randomized(
        estimator: Box<dyn Estimator>,
        sampler: ParameterSampler,
        cv: Arc<dyn FoldGenerator>,
    ) -> Self {
        Self::new(estimator, sampler, cv)
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringOptions) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_registry(mut self, registry: ScorerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_fit_params(mut self, fit_params: Configuration) -> Self {
        self.fit_params = fit_params;
        self
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn result(&self) -> Option<&SearchResult> {
        self.result.as_ref()
    }

    pub fn best_params(&self) -> Option<&Configuration> {
        self.result.as_ref().map(|r| &r.best_configuration)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.result.as_ref().map(|r| r.best_score)
    }

    /// Run the search on `(x, y)`.
    pub fn fit(&mut self, x: &Matrix, y: Option<&[f64]>) -> GsResult<&SearchResult> {
        if self.status.is_terminal() {
            return Err(ConfigError::AlreadyFitted.into());
        }

        self.status.mark_fitting();
        info!(
            search_id = %self.status.id,
            estimator = self.estimator.name(),
            space = self.space.name(),
            "Starting parameter search"
        );

        match self.run(x, y) {
            Ok(result) => {
                self.status.mark_fitted();
                info!(
                    search_id = %self.status.id,
                    best_score = result.best_score,
                    best_params = %result.best_configuration,
                    "Parameter search finished"
                );
                Ok(self.result.insert(result))
            }
            Err(e) => {
                error!(search_id = %self.status.id, error = %e, "Parameter search failed");
                self.status.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    fn run(&self, x: &Matrix, y: Option<&[f64]>) -> GsResult<SearchResult> {
        let start = Instant::now();
        let estimator = self.estimator.as_ref();

        if !Capability::Predict.supported_by(estimator)
            && !Capability::Score.supported_by(estimator)
        {
            return Err(ConfigError::MissingCapability {
                estimator: estimator.name().to_string(),
                capability: format!("{} or {}", Capability::Predict, Capability::Score),
            }
            .into());
        }
        if self.space.is_empty() {
            return Err(ConfigError::NoCandidates.into());
        }

        let scorer = resolve_scorer(&self.scoring, &self.registry, estimator)?;

        if let Some(y) = y {
            if y.len() != x.n_samples() {
                return Err(DataContractError::SampleCountMismatch {
                    targets: y.len(),
                    samples: x.n_samples(),
                }
                .into());
            }
        }

        let folds = self
            .cv
            .split(x, y, estimator.is_classifier())
            .map_err(|e| EvaluationFailure::new(Stage::Split, e))?;
        if folds.is_empty() {
            return Err(ConfigError::NoFolds.into());
        }

        let n_candidates = self.space.len();
        let n_folds = folds.len();
        info!(
            candidates = n_candidates,
            folds = n_folds,
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            n_folds,
            n_candidates,
            n_candidates.saturating_mul(n_folds)
        );

        let pool = ExecutionPool::from_config(&self.config)?;
        let evaluator =
            Evaluator::new(estimator, Arc::clone(&scorer)).with_fit_params(self.fit_params.clone());
        let results = Dispatcher::new(pool, evaluator).dispatch(self.space.iter(), &folds, x, y)?;

        let direction = scorer.direction();
        let summaries = rank(aggregate(&results, n_folds, self.config.iid)?, direction);
        let mut result = SearchResult::new(self.status.id, summaries, direction, n_folds)?
            .with_scorer(Arc::clone(&scorer));

        if self.config.refit {
            let best = self.refit(&result.best_configuration, x, y)?;
            result = result.with_best_estimator(best);
        } else {
            debug!("refit disabled; prediction and scoring on the search are unavailable");
        }

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            evaluations = results.len(),
            "Search evaluation complete"
        );
        Ok(result)
    }

    fn refit(
        &self,
        best: &Configuration,
        x: &Matrix,
        y: Option<&[f64]>,
    ) -> GsResult<Box<dyn Estimator>> {
        let stage = |e| {
            SearchError::from(EvaluationFailure::new(Stage::Refit, e).with_parameters(best))
        };

        let mut model = self.estimator.clone_unfitted();
        model.set_params(best).map_err(stage)?;
        model.fit(x, y, &self.fit_params).map_err(stage)?;
        info!(params = %best, "Refit best configuration on the full dataset");
        Ok(model)
    }

    /// Forward to the refit estimator.
    pub fn predict(&self, x: &Matrix) -> GsResult<Vec<f64>> {
        self.fitted()?.predict(x)
    }

    pub fn predict_proba(&self, x: &Matrix) -> GsResult<Matrix> {
        self.fitted()?.predict_proba(x)
    }

    pub fn decision_function(&self, x: &Matrix) -> GsResult<Matrix> {
        self.fitted()?.decision_function(x)
    }

    pub fn transform(&self, x: &Matrix) -> GsResult<Matrix> {
        self.fitted()?.transform(x)
    }

    pub fn score(&self, x: &Matrix, y: Option<&[f64]>) -> GsResult<f64> {
        self.fitted()?.score(x, y)
    }

    fn fitted(&self) -> GsResult<&SearchResult> {
        self.result
            .as_ref()
            .ok_or_else(|| SearchError::NotFitted("call fit before using the search".into()))
    }
}
