//! Toy collaborators shared by the unit tests.

use anyhow::{anyhow, bail};
use tracing_subscriber::EnvFilter;

use gs_types::{
    Configuration, Estimator, Fold, FoldGenerator, Matrix, ObjectiveDirection, ParamValue,
    Predict, Scorer, SelfScore,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn mse(y: &[f64], p: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    y.iter().zip(p).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / y.len() as f64
}

/// Predicts `mean(y_train) + shift` for every sample; scores as `-MSE`.
///
/// `shift` is the only settable parameter. The `bias` fit parameter is added
/// to the learned mean.
#[derive(Debug, Clone)]
pub struct ShiftRegressor {
    shift: f64,
    fail_on_train_size: Option<usize>,
    self_scoring: bool,
    pairwise: bool,
    custom_kernel: bool,
    mean: Option<f64>,
}

impl ShiftRegressor {
    pub fn new(shift: f64) -> Self {
        Self {
            shift,
            fail_on_train_size: None,
            self_scoring: true,
            pairwise: false,
            custom_kernel: false,
            mean: None,
        }
    }

    pub fn failing_on_train_size(mut self, n: usize) -> Self {
        self.fail_on_train_size = Some(n);
        self
    }

    pub fn without_self_score(mut self) -> Self {
        self.self_scoring = false;
        self
    }

    pub fn pairwise(mut self) -> Self {
        self.pairwise = true;
        self
    }

    pub fn with_custom_kernel(mut self) -> Self {
        self.custom_kernel = true;
        self
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

impl Estimator for ShiftRegressor {
    fn name(&self) -> &str {
        "ShiftRegressor"
    }

    fn clone_unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            mean: None,
            ..self.clone()
        })
    }

    fn set_params(&mut self, params: &Configuration) -> anyhow::Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "shift" => {
                    self.shift = value
                        .as_f64()
                        .ok_or_else(|| anyhow!("shift must be numeric, got {value}"))?;
                }
                other => bail!("unknown parameter {other}"),
            }
        }
        Ok(())
    }

    fn fit(
        &mut self,
        x: &Matrix,
        y: Option<&[f64]>,
        fit_params: &Configuration,
    ) -> anyhow::Result<()> {
        if self.fail_on_train_size == Some(x.n_samples()) {
            bail!("refusing to fit on {} samples", x.n_samples());
        }
        let y = y.ok_or_else(|| anyhow!("targets are required"))?;
        if y.is_empty() {
            bail!("no training samples");
        }

        let mut bias = 0.0;
        for (name, value) in fit_params {
            match (name.as_str(), value) {
                ("bias", v) => {
                    bias = v.as_f64().ok_or_else(|| anyhow!("bias must be numeric"))?;
                }
                (other, _) => bail!("unknown fit parameter {other}"),
            }
        }

        self.mean = Some(y.iter().sum::<f64>() / y.len() as f64 + bias);
        Ok(())
    }

    fn is_pairwise(&self) -> bool {
        self.pairwise
    }

    fn uses_custom_kernel(&self) -> bool {
        self.custom_kernel
    }

    fn as_predictor(&self) -> Option<&dyn Predict> {
        Some(self)
    }

    fn as_self_scoring(&self) -> Option<&dyn SelfScore> {
        if self.self_scoring {
            Some(self)
        } else {
            None
        }
    }
}

impl Predict for ShiftRegressor {
    fn predict(&self, x: &Matrix) -> anyhow::Result<Vec<f64>> {
        let mean = self.mean.ok_or_else(|| anyhow!("not fitted"))?;
        Ok(vec![mean + self.shift; x.n_samples()])
    }
}

impl SelfScore for ShiftRegressor {
    fn score(&self, x: &Matrix, y: Option<&[f64]>) -> anyhow::Result<f64> {
        let y = y.ok_or_else(|| anyhow!("targets are required"))?;
        Ok(-mse(y, &self.predict(x)?))
    }
}

/// Contiguous, unshuffled k-fold; the first `n % k` folds get one extra sample.
#[derive(Debug, Clone, Copy)]
pub struct ConsecutiveKFold {
    n_splits: usize,
}

impl ConsecutiveKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }
}

impl FoldGenerator for ConsecutiveKFold {
    fn split(
        &self,
        x: &Matrix,
        _y: Option<&[f64]>,
        _classifier: bool,
    ) -> anyhow::Result<Vec<Fold>> {
        let n = x.n_samples();
        if self.n_splits < 2 || self.n_splits > n {
            bail!("cannot split {n} samples into {} folds", self.n_splits);
        }

        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let test: Vec<usize> = (start..start + size).collect();
            let train: Vec<usize> = (0..start).chain(start + size..n).collect();
            folds.push(Fold::new(train, test));
            start += size;
        }
        Ok(folds)
    }
}

/// Hands out a fixed list of folds.
#[derive(Debug, Clone)]
pub struct FixedFolds(pub Vec<Fold>);

impl FoldGenerator for FixedFolds {
    fn split(
        &self,
        _x: &Matrix,
        _y: Option<&[f64]>,
        _classifier: bool,
    ) -> anyhow::Result<Vec<Fold>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NanScorer;

impl Scorer for NanScorer {
    fn score(
        &self,
        _estimator: &dyn Estimator,
        _x: &Matrix,
        _y: Option<&[f64]>,
    ) -> anyhow::Result<f64> {
        Ok(f64::NAN)
    }

    fn direction(&self) -> ObjectiveDirection {
        ObjectiveDirection::Maximize
    }
}

pub fn shift_value(config: &Configuration) -> Option<f64> {
    config.get("shift").and_then(ParamValue::as_f64)
}
