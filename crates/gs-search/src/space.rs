//! Search space definitions: exhaustive grids and the space enum the search
//! controller consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use gs_types::{CandidateValues, ConfigError, Configuration, GsResult, ParamValue};

use crate::sampler::ParameterSampler;

/// One group of grid axes: parameter name → candidate values.
///
/// Names are kept sorted, so enumeration order never depends on the order the
/// axes were declared in.
pub type AxisGroup = BTreeMap<String, CandidateValues>;

/// Exhaustive grid over one or more axis groups.
///
/// Enumeration concatenates the groups in order. Within a group it walks the
/// Cartesian product with the last (lexicographically greatest) parameter
/// changing fastest. An empty group contributes one empty configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    groups: Vec<AxisGroup>,
}

impl ParameterGrid {
    pub fn new(groups: Vec<AxisGroup>) -> GsResult<Self> {
        if groups.is_empty() {
            return Err(ConfigError::InvalidGrid {
                found: "an empty list of groups".into(),
            }
            .into());
        }
        for group in &groups {
            for (name, values) in group {
                values.validate(name)?;
            }
        }
        Ok(Self { groups })
    }

    /// A single mapping is a grid of exactly one group.
    pub fn single(group: AxisGroup) -> GsResult<Self> {
        Self::new(vec![group])
    }

    pub fn builder() -> GridBuilder {
        GridBuilder::default()
    }

    /// Parse a JSON mapping, or a JSON list of mappings, of parameter name to
    /// candidate values.
    ///
    /// Candidate values are JSON arrays or `{"shape": [...], "data": [...]}`
    /// array objects.
    pub fn from_json(value: &serde_json::Value) -> GsResult<Self> {
        match value {
            serde_json::Value::Object(_) => Self::single(parse_group(value)?),
            serde_json::Value::Array(items) => {
                let groups = items.iter().map(parse_group).collect::<GsResult<Vec<_>>>()?;
                Self::new(groups)
            }
            other => Err(ConfigError::InvalidGrid {
                found: json_kind(other).into(),
            }
            .into()),
        }
    }

    pub fn groups(&self) -> &[AxisGroup] {
        &self.groups
    }

    /// Number of configurations, computed without enumerating them.
    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .map(|group| {
                group
                    .values()
                    .fold(1usize, |acc, values| acc.saturating_mul(values.len()))
            })
            .fold(0usize, usize::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a fresh enumeration pass.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            groups: &self.groups,
            group: 0,
            axes: Vec::new(),
            cursor: Vec::new(),
            loaded: false,
            exhausted: false,
        }
    }
}

impl<'a> IntoIterator for &'a ParameterGrid {
    type Item = Configuration;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy odometer over the grid's groups.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    groups: &'a [AxisGroup],
    group: usize,
    axes: Vec<(&'a str, &'a [ParamValue])>,
    cursor: Vec<usize>,
    loaded: bool,
    exhausted: bool,
}

impl GridIter<'_> {
    fn advance(&mut self) {
        let mut axis = self.axes.len();
        loop {
            if axis == 0 {
                self.exhausted = true;
                return;
            }
            axis -= 1;
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.axes[axis].1.len() {
                return;
            }
            self.cursor[axis] = 0;
        }
    }
}

impl Iterator for GridIter<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Configuration> {
        let groups = self.groups;
        loop {
            let group = groups.get(self.group)?;
            if !self.loaded {
                self.axes = group
                    .iter()
                    .map(|(name, values)| (name.as_str(), values.values()))
                    .collect();
                self.cursor = vec![0; self.axes.len()];
                self.loaded = true;
                self.exhausted = false;
            }
            if self.exhausted {
                self.group += 1;
                self.loaded = false;
                continue;
            }

            let config = self
                .axes
                .iter()
                .zip(&self.cursor)
                .map(|((name, values), &i)| (*name, values[i].clone()))
                .collect();
            self.advance();
            return Some(config);
        }
    }
}

/// Fluent construction of multi-group grids.
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    groups: Vec<AxisGroup>,
    current: AxisGroup,
}

impl GridBuilder {
    pub fn axis(mut self, name: impl Into<String>, values: impl Into<CandidateValues>) -> Self {
        self.current.insert(name.into(), values.into());
        self
    }

    /// Close the current group and start a new one.
    pub fn next_group(mut self) -> Self {
        self.groups.push(std::mem::take(&mut self.current));
        self
    }

    pub fn build(mut self) -> GsResult<ParameterGrid> {
        self.groups.push(self.current);
        ParameterGrid::new(self.groups)
    }
}

fn parse_group(value: &serde_json::Value) -> GsResult<AxisGroup> {
    let map = value.as_object().ok_or_else(|| ConfigError::InvalidGrid {
        found: json_kind(value).into(),
    })?;
    let mut group = AxisGroup::new();
    for (name, raw) in map {
        let values = match raw {
            serde_json::Value::Array(items) => {
                CandidateValues::List(items.iter().map(ParamValue::from_json).collect())
            }
            serde_json::Value::Object(obj) if obj.contains_key("shape") => {
                let shape: Vec<usize> = serde_json::from_value(obj["shape"].clone())?;
                let data = obj
                    .get("data")
                    .and_then(|d| d.as_array())
                    .ok_or_else(|| ConfigError::NotASequence {
                        parameter: name.clone(),
                    })?;
                CandidateValues::Array {
                    shape,
                    data: data.iter().map(ParamValue::from_json).collect(),
                }
            }
            _ => {
                return Err(ConfigError::NotASequence {
                    parameter: name.clone(),
                }
                .into())
            }
        };
        group.insert(name.clone(), values);
    }
    Ok(group)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "a mapping",
    }
}

// ---------------------------------------------------------------------------
// Parameter space
// ---------------------------------------------------------------------------

/// The candidate sequence a search evaluates.
#[derive(Debug, Clone)]
pub enum ParameterSpace {
    Grid(ParameterGrid),
    Sampler(ParameterSampler),
}

impl ParameterSpace {
    pub fn len(&self) -> usize {
        match self {
            Self::Grid(grid) => grid.len(),
            Self::Sampler(sampler) => sampler.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A fresh, restartable enumeration pass.
    pub fn iter(&self) -> Box<dyn Iterator<Item = Configuration> + '_> {
        match self {
            Self::Grid(grid) => Box::new(grid.iter()),
            Self::Sampler(sampler) => Box::new(sampler.iter()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Grid(_) => "grid",
            Self::Sampler(_) => "randomized",
        }
    }
}

impl From<ParameterGrid> for ParameterSpace {
    fn from(grid: ParameterGrid) -> Self {
        Self::Grid(grid)
    }
}

impl From<ParameterSampler> for ParameterSpace {
    fn from(sampler: ParameterSampler) -> Self {
        Self::Sampler(sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grid_enumerates_in_product_order() {
        let grid = ParameterGrid::builder()
            .axis("a", vec![1, 2])
            .axis("b", vec![true, false])
            .build()
            .unwrap();

        assert_eq!(grid.len(), 4);
        let configs: Vec<Configuration> = grid.iter().collect();
        assert_eq!(
            configs,
            vec![
                Configuration::new().with("a", 1).with("b", true),
                Configuration::new().with("a", 1).with("b", false),
                Configuration::new().with("a", 2).with("b", true),
                Configuration::new().with("a", 2).with("b", false),
            ]
        );
    }

    #[test]
    fn declaration_order_does_not_change_enumeration() {
        let forward = ParameterGrid::builder()
            .axis("a", vec![1, 2])
            .axis("b", vec![3, 4])
            .build()
            .unwrap();
        let reversed = ParameterGrid::builder()
            .axis("b", vec![3, 4])
            .axis("a", vec![1, 2])
            .build()
            .unwrap();

        let a: Vec<_> = forward.iter().collect();
        let b: Vec<_> = reversed.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn grid_of_grids_keeps_group_order() {
        let grid = ParameterGrid::builder()
            .axis("kernel", vec!["linear"])
            .next_group()
            .axis("kernel", vec!["rbf"])
            .axis("gamma", vec![1, 10])
            .build()
            .unwrap();

        assert_eq!(grid.len(), 3);
        let configs: Vec<Configuration> = grid.iter().collect();
        assert_eq!(
            configs,
            vec![
                Configuration::new().with("kernel", "linear"),
                Configuration::new().with("kernel", "rbf").with("gamma", 1),
                Configuration::new().with("kernel", "rbf").with("gamma", 10),
            ]
        );
    }

    #[test]
    fn empty_grid_yields_one_empty_configuration() {
        let grid = ParameterGrid::single(AxisGroup::new()).unwrap();
        assert_eq!(grid.len(), 1);
        let configs: Vec<Configuration> = grid.iter().collect();
        assert_eq!(configs, vec![Configuration::new()]);
    }

    #[test]
    fn iteration_is_restartable() {
        let grid = ParameterGrid::builder()
            .axis("x", vec![1, 2, 3])
            .build()
            .unwrap();
        let first: Vec<_> = grid.iter().collect();
        let second: Vec<_> = (&grid).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn len_is_closed_form_for_large_grids() {
        let values: Vec<i64> = (0..1000).collect();
        let grid = ParameterGrid::builder()
            .axis("a", values.clone())
            .axis("b", values.clone())
            .axis("c", values)
            .build()
            .unwrap();
        assert_eq!(grid.len(), 1_000_000_000);
        assert_eq!(grid.iter().take(2).count(), 2);
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        let err = ParameterGrid::builder()
            .axis("a", Vec::<i64>::new())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            gs_types::SearchError::Config(ConfigError::EmptyCandidates { .. })
        ));
    }

    #[test]
    fn grid_from_json_mapping_and_list() {
        let single = ParameterGrid::from_json(&json!({"a": [1, 2], "b": [true, false]})).unwrap();
        assert_eq!(single.len(), 4);
        assert_eq!(single.groups().len(), 1);

        let multi = ParameterGrid::from_json(&json!([
            {"kernel": ["linear"]},
            {"kernel": ["rbf"], "gamma": [1, 10]}
        ]))
        .unwrap();
        assert_eq!(multi.len(), 3);
    }

    #[test]
    fn grid_from_json_rejects_scalar_values() {
        let err = ParameterGrid::from_json(&json!({"a": 1})).unwrap_err();
        assert!(err.to_string().contains("should be a list"));
    }

    #[test]
    fn grid_from_json_rejects_two_dimensional_arrays() {
        let err = ParameterGrid::from_json(&json!({
            "a": {"shape": [2, 2], "data": [1, 2, 3, 4]}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("one-dimensional"));

        let ok = ParameterGrid::from_json(&json!({
            "a": {"shape": [3], "data": [1, 2, 3]}
        }))
        .unwrap();
        assert_eq!(ok.len(), 3);
    }

    #[test]
    fn grid_from_json_rejects_non_mapping() {
        assert!(ParameterGrid::from_json(&json!("a")).is_err());
        assert!(ParameterGrid::from_json(&json!([])).is_err());
    }

    #[test]
    fn space_delegates_to_grid() {
        let grid = ParameterGrid::builder().axis("a", vec![1, 2]).build().unwrap();
        let space = ParameterSpace::from(grid);
        assert_eq!(space.len(), 2);
        assert_eq!(space.iter().count(), 2);
        assert_eq!(space.name(), "grid");
    }
}
