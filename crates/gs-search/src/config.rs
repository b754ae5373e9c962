//! Search configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use gs_types::{ConfigError, GsResult};

/// Execution and aggregation knobs of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Worker count. Negative values count back from the CPU count
    /// (`-1` = all CPUs, `-2` = all but one); zero is invalid.
    pub n_jobs: i32,
    /// Bound on evaluation tasks materialized ahead of execution.
    pub pre_dispatch: PreDispatch,
    /// Weight fold scores by held-out sample count.
    pub iid: bool,
    /// Retrain the best configuration on the full data after the search.
    pub refit: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_jobs: 1,
            pre_dispatch: PreDispatch::PerJob(2),
            iid: true,
            refit: true,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_pre_dispatch(mut self, pre_dispatch: PreDispatch) -> Self {
        self.pre_dispatch = pre_dispatch;
        self
    }

    pub fn with_iid(mut self, iid: bool) -> Self {
        self.iid = iid;
        self
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    pub fn from_json(json: &str) -> GsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Concrete worker count for this machine.
    pub fn resolve_n_jobs(&self) -> GsResult<usize> {
        resolve_n_jobs(self.n_jobs, available_cpus())
    }

    /// Concrete dispatch window for this machine.
    pub fn resolve_window(&self) -> GsResult<usize> {
        Ok(self.pre_dispatch.resolve(self.resolve_n_jobs()?))
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn resolve_n_jobs(n_jobs: i32, cpus: usize) -> GsResult<usize> {
    match n_jobs {
        0 => Err(ConfigError::ZeroJobs.into()),
        n if n > 0 => Ok(n as usize),
        n => {
            let back = n.unsigned_abs() as usize - 1;
            Ok(cpus.saturating_sub(back).max(1))
        }
    }
}

/// How many evaluation tasks may exist ahead of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PreDispatch {
    /// Materialize every task up front.
    All,
    Fixed(usize),
    /// `k * n_jobs`.
    PerJob(usize),
}

impl PreDispatch {
    /// Window size given the resolved worker count; never below one.
    pub fn resolve(self, n_jobs: usize) -> usize {
        let window = match self {
            Self::All => usize::MAX,
            Self::Fixed(n) => n,
            Self::PerJob(k) => k.saturating_mul(n_jobs),
        };
        window.max(1)
    }
}

impl Default for PreDispatch {
    fn default() -> Self {
        Self::PerJob(2)
    }
}

impl fmt::Display for PreDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Fixed(n) => write!(f, "{n}"),
            Self::PerJob(k) => write!(f, "{k}*n_jobs"),
        }
    }
}

impl FromStr for PreDispatch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || ConfigError::InvalidPreDispatch {
            value: s.to_string(),
        };

        if value.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if let Some(k) = value.strip_suffix("n_jobs") {
            let k = k.trim().trim_end_matches('*').trim();
            if k.is_empty() {
                return Ok(Self::PerJob(1));
            }
            return k.parse().map(Self::PerJob).map_err(|_| invalid());
        }
        value.parse().map(Self::Fixed).map_err(|_| invalid())
    }
}

impl TryFrom<String> for PreDispatch {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PreDispatch> for String {
    fn from(value: PreDispatch) -> Self {
        value.to_string()
    }
}
