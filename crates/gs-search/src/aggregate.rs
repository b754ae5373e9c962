//! Fold results to per-configuration summaries, and ranking.

use std::cmp::Ordering;

use tracing::warn;

use gs_types::{
    internal_error, ConfigError, ConfigurationSummary, DataContractError, EvaluationResult,
    GsResult, ObjectiveDirection,
};

/// Group consecutive runs of `n_folds` results into one summary each.
///
/// With `iid` the mean is weighted by each fold's held-out sample count;
/// otherwise every fold counts equally. Summaries come back in candidate
/// order with `rank` unset.
pub fn aggregate(
    results: &[EvaluationResult],
    n_folds: usize,
    iid: bool,
) -> GsResult<Vec<ConfigurationSummary>> {
    if n_folds == 0 {
        return Err(ConfigError::NoFolds.into());
    }
    if results.len() % n_folds != 0 {
        return Err(internal_error!(
            "{} results cannot be split into groups of {} folds",
            results.len(),
            n_folds
        ));
    }

    results
        .chunks(n_folds)
        .enumerate()
        .map(|(candidate, group)| summarize(candidate, group, iid))
        .collect()
}

fn summarize(
    candidate: usize,
    group: &[EvaluationResult],
    iid: bool,
) -> GsResult<ConfigurationSummary> {
    if let Some(stray) = group.iter().find(|r| r.candidate != candidate) {
        return Err(internal_error!(
            "fold results of candidate {candidate} include candidate {}",
            stray.candidate
        ));
    }

    let fold_scores: Vec<f64> = group.iter().map(|r| r.score).collect();
    let mean_score = if iid {
        let n_test: usize = group.iter().map(|r| r.n_test_samples).sum();
        if n_test == 0 {
            return Err(DataContractError::NoTestSamples { candidate }.into());
        }
        group
            .iter()
            .map(|r| r.score * r.n_test_samples as f64)
            .sum::<f64>()
            / n_test as f64
    } else {
        fold_scores.iter().sum::<f64>() / group.len() as f64
    };

    if mean_score.is_nan() {
        warn!(candidate, ?fold_scores, "mean score is undefined; ranking candidate last");
    }

    Ok(ConfigurationSummary {
        candidate,
        rank: 0,
        configuration: group[0].configuration.clone(),
        mean_score,
        fold_scores,
    })
}

/// Sort best first and assign 1-based ranks.
///
/// The sort is stable, so equal means keep their enumeration order and the
/// earliest configuration wins a tie. An undefined (NaN) mean always ranks
/// after every defined one.
pub fn rank(
    mut summaries: Vec<ConfigurationSummary>,
    direction: ObjectiveDirection,
) -> Vec<ConfigurationSummary> {
    summaries.sort_by(|a, b| compare_means(a.mean_score, b.mean_score, direction));
    for (i, summary) in summaries.iter_mut().enumerate() {
        summary.rank = i + 1;
    }
    summaries
}

fn compare_means(a: f64, b: f64, direction: ObjectiveDirection) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if direction.improves(a, b) => Ordering::Less,
        (false, false) if direction.improves(b, a) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}
