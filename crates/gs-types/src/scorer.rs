use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Matrix;
use crate::estimator::Estimator;

/// Whether a score is maximized or minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl ObjectiveDirection {
    pub fn greater_is_better(self) -> bool {
        matches!(self, Self::Maximize)
    }

    /// True when `candidate` strictly improves on `incumbent`.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// Maps a fitted estimator and held-out data to a real-valued score.
pub trait Scorer: Send + Sync + fmt::Debug {
    fn score(&self, estimator: &dyn Estimator, x: &Matrix, y: Option<&[f64]>)
        -> anyhow::Result<f64>;

    fn direction(&self) -> ObjectiveDirection {
        ObjectiveDirection::Maximize
    }
}
