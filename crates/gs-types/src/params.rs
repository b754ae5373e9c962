//! Parameter values, configurations and grid candidate collections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{ConfigError, GsResult};

/// A concrete parameter value handed to an estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(serde_json::Value),
}

impl ParamValue {
    /// Convert a JSON value, keeping scalars in their typed variants.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        Self::from_json(&v)
    }
}

/// One concrete assignment of values to parameter names.
///
/// Keys are kept in lexicographic order so that display and serialization are
/// reproducible; the order carries no search semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(BTreeMap<String, ParamValue>);

impl Configuration {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The candidate values of one grid axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateValues {
    /// A plain ordered list.
    List(Vec<ParamValue>),
    /// An ndarray-like block with an explicit shape; only one-dimensional
    /// arrays are accepted as grid axes.
    Array {
        shape: Vec<usize>,
        data: Vec<ParamValue>,
    },
}

impl CandidateValues {
    /// Check that the values form a finite, non-empty, one-dimensional
    /// sequence.
    pub fn validate(&self, parameter: &str) -> GsResult<()> {
        let data = match self {
            Self::List(values) => values,
            Self::Array { shape, data } => {
                if shape.len() > 1 {
                    return Err(ConfigError::MultiDimensional {
                        parameter: parameter.to_string(),
                        ndim: shape.len(),
                    }
                    .into());
                }
                let expected: usize = shape.iter().product();
                if expected != data.len() {
                    return Err(ConfigError::ShapeMismatch {
                        parameter: parameter.to_string(),
                        shape: shape.clone(),
                        len: data.len(),
                    }
                    .into());
                }
                data
            }
        };
        if data.is_empty() {
            return Err(ConfigError::EmptyCandidates {
                parameter: parameter.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn values(&self) -> &[ParamValue] {
        match self {
            Self::List(values) => values,
            Self::Array { data, .. } => data,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for CandidateValues {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configuration_displays_sorted_keys() {
        let config = Configuration::new()
            .with("kernel", "rbf")
            .with("gamma", 10)
            .with("shrinking", true);

        assert_eq!(config.to_string(), "{gamma=10, kernel=rbf, shrinking=true}");
    }

    #[test]
    fn configuration_equality_ignores_insertion_order() {
        let a = Configuration::new().with("a", 1).with("b", 2.5);
        let b = Configuration::new().with("b", 2.5).with("a", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn param_value_from_json_keeps_scalar_types() {
        assert_eq!(ParamValue::from_json(&json!(3)), ParamValue::Int(3));
        assert_eq!(ParamValue::from_json(&json!(0.5)), ParamValue::Float(0.5));
        assert_eq!(ParamValue::from_json(&json!(false)), ParamValue::Bool(false));
        assert_eq!(
            ParamValue::from_json(&json!("l2")),
            ParamValue::Str("l2".into())
        );
        assert_eq!(
            ParamValue::from_json(&json!([10, 20])),
            ParamValue::Json(json!([10, 20]))
        );
    }

    #[test]
    fn configuration_serializes_as_plain_mapping() {
        let config = Configuration::new().with("C", 1.5).with("kernel", "linear");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value, json!({"C": 1.5, "kernel": "linear"}));

        let back: Configuration = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn candidate_list_must_not_be_empty() {
        let empty = CandidateValues::List(Vec::new());
        let err = empty.validate("C").unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn two_dimensional_array_is_rejected() {
        let values = CandidateValues::Array {
            shape: vec![2, 2],
            data: vec![1.into(), 2.into(), 3.into(), 4.into()],
        };
        let err = values.validate("alpha").unwrap_err();
        assert!(err.to_string().contains("one-dimensional"));
    }

    #[test]
    fn one_dimensional_array_is_accepted() {
        let values = CandidateValues::Array {
            shape: vec![3],
            data: vec![0.1.into(), 1.0.into(), 10.0.into()],
        };
        assert!(values.validate("alpha").is_ok());
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn array_shape_must_match_data() {
        let values = CandidateValues::Array {
            shape: vec![4],
            data: vec![1.into()],
        };
        assert!(values.validate("alpha").is_err());
    }
}
