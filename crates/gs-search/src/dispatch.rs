//! Parallel execution of evaluation tasks.
//!
//! Tasks are pulled lazily from their source and run in windows of at most
//! `window` tasks, so no more than one window of fold partitions is alive at
//! a time. Results always come back in task-creation order, whatever order
//! the workers finished in.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use gs_types::{internal_error, Configuration, EvaluationResult, Fold, GsResult, Matrix};

use crate::config::SearchConfig;
use crate::evaluator::{Evaluator, Partition, WorkUnit};

/// A fixed-size worker pool with a bounded dispatch window.
#[derive(Debug)]
pub struct ExecutionPool {
    n_jobs: usize,
    window: usize,
    pool: Option<ThreadPool>,
}

impl ExecutionPool {
    /// `n_jobs == 1` runs every task inline on the calling thread.
    pub fn new(n_jobs: usize, window: usize) -> GsResult<Self> {
        let n_jobs = n_jobs.max(1);
        let pool = if n_jobs > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(n_jobs)
                .thread_name(|i| format!("gs-worker-{i}"))
                .build()
                .map_err(|e| internal_error!("failed to start worker pool: {e}"))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            n_jobs,
            window: window.max(1),
            pool,
        })
    }

    pub fn from_config(config: &SearchConfig) -> GsResult<Self> {
        Self::new(config.resolve_n_jobs()?, config.resolve_window()?)
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Run `work` over every task, returning outputs in task order.
    ///
    /// The first error, whether from creating a task or running one, aborts
    /// the run; tasks in later windows are never created.
    pub fn run_ordered<I, U, T, F>(&self, tasks: I, work: F) -> GsResult<Vec<T>>
    where
        I: IntoIterator<Item = GsResult<U>>,
        U: Send,
        T: Send,
        F: Fn(U) -> GsResult<T> + Sync + Send,
    {
        let mut tasks = tasks.into_iter();
        let mut outputs = Vec::new();

        loop {
            let mut batch = Vec::with_capacity(self.window.min(1024));
            for task in tasks.by_ref().take(self.window) {
                batch.push(task?);
            }
            if batch.is_empty() {
                break;
            }

            debug!(
                window = batch.len(),
                completed = outputs.len(),
                n_jobs = self.n_jobs,
                "dispatching evaluation window"
            );

            let results = match &self.pool {
                Some(pool) => {
                    pool.install(|| batch.into_par_iter().map(&work).collect::<GsResult<Vec<T>>>())?
                }
                None => batch.into_iter().map(&work).collect::<GsResult<Vec<T>>>()?,
            };
            outputs.extend(results);
        }

        Ok(outputs)
    }
}

/// Runs every (configuration, fold) pair through an evaluator.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    pool: ExecutionPool,
    evaluator: Evaluator<'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(pool: ExecutionPool, evaluator: Evaluator<'a>) -> Self {
        Self { pool, evaluator }
    }

    /// Results are ordered configuration-major, fold-minor: the result for
    /// configuration `i` on fold `j` sits at `i * folds.len() + j`.
    pub fn dispatch<I>(
        &self,
        configurations: I,
        folds: &[Fold],
        x: &Matrix,
        y: Option<&[f64]>,
    ) -> GsResult<Vec<EvaluationResult>>
    where
        I: IntoIterator<Item = Configuration>,
    {
        let pairwise = self.evaluator.is_pairwise();
        let units = configurations
            .into_iter()
            .enumerate()
            .flat_map(move |(candidate, configuration)| {
                folds
                    .iter()
                    .enumerate()
                    .map(move |(fold, split)| -> GsResult<WorkUnit> {
                        Ok(WorkUnit {
                            candidate,
                            fold,
                            configuration: configuration.clone(),
                            partition: Partition::materialize(x, y, split, pairwise)?,
                        })
                    })
            });

        self.pool.run_ordered(units, |unit| self.evaluator.run(unit))
    }
}
