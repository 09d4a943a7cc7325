//! Hyperparameter sets
//!
//! A hyperparameter set is an ordered mapping from name to a scalar (or null).
//! Backends read their recognized keys through [`ParamReader`], which resolves
//! aliases, applies defaults and rejects values of the wrong shape.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HyperValue {
    /// Explicit absence (e.g. unbounded `max_depth`)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (e.g. `task_type`)
    Str(String),
}

impl HyperValue {
    /// Short type name used in validation messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }

    /// Integer view; integral floats are accepted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
            _ => None,
        }
    }

    /// Float view; integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String view.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HyperValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for HyperValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for HyperValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for HyperValue {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Self::Null, Self::Int)
    }
}

impl From<f64> for HyperValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for HyperValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for HyperValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for HyperValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for HyperValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Ordered hyperparameter mapping.
///
/// Keys iterate in lexicographic order, so equal sets always serialize to the
/// same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(BTreeMap<String, HyperValue>);

impl Hyperparameters {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HyperValue>) -> Option<HyperValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HyperValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HyperValue> {
        self.0.get(key)
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HyperValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shallow overlay: keys present in `overrides` replace ours, all other keys are kept.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut out = self.clone();
        for (key, value) in &overrides.0 {
            out.0.insert(key.clone(), value.clone());
        }
        out
    }
}

impl<K: Into<String>, V: Into<HyperValue>> FromIterator<(K, V)> for Hyperparameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Canonical spelling of `key` among `groups` (canonical name first, then aliases).
pub(crate) fn canonical_key(groups: &[&'static [&'static str]], key: &str) -> Option<&'static str> {
    groups
        .iter()
        .find(|keys| keys.contains(&key))
        .and_then(|keys| keys.first().copied())
}

/// Typed, alias-aware reader over a hyperparameter set.
///
/// Each lookup takes the canonical key first, followed by accepted aliases.
pub(crate) struct ParamReader<'a> {
    params: &'a Hyperparameters,
    class_name: &'static str,
}

impl<'a> ParamReader<'a> {
    pub(crate) const fn new(params: &'a Hyperparameters, class_name: &'static str) -> Self {
        Self { params, class_name }
    }

    fn lookup(&self, keys: &[&str]) -> Option<(&'a str, &'a HyperValue)> {
        keys.iter()
            .find_map(|k| self.params.0.get_key_value(*k))
            .map(|(k, v)| (k.as_str(), v))
    }

    fn invalid(&self, key: &str, expected: &str, got: &HyperValue) -> Error {
        Error::validation(format!(
            "{}: hyperparameter '{key}' must be {expected}, got {} ({got})",
            self.class_name,
            got.type_name()
        ))
    }

    pub(crate) fn string(&self, keys: &[&str], default: &str) -> Result<String> {
        match self.lookup(keys) {
            None | Some((_, HyperValue::Null)) => Ok(default.to_string()),
            Some((_, HyperValue::Str(s))) => Ok(s.clone()),
            Some((key, other)) => Err(self.invalid(key, "a string", other)),
        }
    }

    /// Integer `>= min`.
    pub(crate) fn int_at_least(&self, keys: &[&str], default: usize, min: usize) -> Result<usize> {
        self.optional_int_at_least(keys, min)
            .map(|v| v.unwrap_or(default))
    }

    /// Integer `>= min`, or `None` when absent or null.
    pub(crate) fn optional_int_at_least(&self, keys: &[&str], min: usize) -> Result<Option<usize>> {
        let Some((key, value)) = self.lookup(keys) else {
            return Ok(None);
        };
        if matches!(value, HyperValue::Null) {
            return Ok(None);
        }
        value
            .as_i64()
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v >= min)
            .map(Some)
            .ok_or_else(|| self.invalid(key, &format!("an integer >= {min}"), value))
    }

    /// Finite float `> 0`.
    pub(crate) fn positive_float(&self, keys: &[&str], default: f64) -> Result<f64> {
        match self.lookup(keys) {
            None | Some((_, HyperValue::Null)) => Ok(default),
            Some((key, value)) => value
                .as_f64()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| self.invalid(key, "a positive number", value)),
        }
    }

    /// Log keys that the backend does not recognize.
    pub(crate) fn warn_unrecognized(&self, recognized: &[&str]) {
        for key in self.params.0.keys() {
            if !recognized.contains(&key.as_str()) {
                tracing::warn!(
                    class_name = self.class_name,
                    key = %key,
                    "ignoring unrecognized hyperparameter"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_shapes() {
        let params: Hyperparameters = serde_json::from_str(
            r#"{"n_estimators": 100, "C": 0.5, "max_depth": null, "task_type": "regression", "warm": false}"#,
        )
        .unwrap();

        assert_eq!(params.get("n_estimators"), Some(&HyperValue::Int(100)));
        assert_eq!(params.get("C"), Some(&HyperValue::Float(0.5)));
        assert_eq!(params.get("max_depth"), Some(&HyperValue::Null));
        assert_eq!(params.get("task_type"), Some(&HyperValue::from("regression")));
        assert_eq!(params.get("warm"), Some(&HyperValue::Bool(false)));
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let params = Hyperparameters::new()
            .with("C", 0.1 + 0.2)
            .with("n_estimators", 7_i64)
            .with("max_depth", HyperValue::Null);

        let json = serde_json::to_string(&params).unwrap();
        let back: Hyperparameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_merged_is_shallow_overlay() {
        let base = Hyperparameters::new()
            .with("n_estimators", 100_i64)
            .with("max_depth", HyperValue::Null);
        let overrides = Hyperparameters::new().with("max_depth", 3_i64);

        let merged = base.merged(&overrides);
        assert_eq!(merged.get("n_estimators"), Some(&HyperValue::Int(100)));
        assert_eq!(merged.get("max_depth"), Some(&HyperValue::Int(3)));
        // original untouched
        assert_eq!(base.get("max_depth"), Some(&HyperValue::Null));
    }

    #[test]
    fn test_reader_aliases_and_defaults() {
        let params = Hyperparameters::new().with("ensemble_size", 12_i64);
        let reader = ParamReader::new(&params, "tree_ensemble");

        assert_eq!(reader.int_at_least(&["n_estimators", "ensemble_size"], 100, 1).unwrap(), 12);
        assert_eq!(reader.int_at_least(&["min_samples_split", "min_split"], 2, 2).unwrap(), 2);
        assert_eq!(reader.optional_int_at_least(&["max_depth"], 1).unwrap(), None);
        assert_eq!(reader.string(&["task_type"], "classification").unwrap(), "classification");
    }

    #[test]
    fn test_reader_canonical_key_wins() {
        let params = Hyperparameters::new()
            .with("n_estimators", 5_i64)
            .with("ensemble_size", 9_i64);
        let reader = ParamReader::new(&params, "tree_ensemble");
        assert_eq!(reader.int_at_least(&["n_estimators", "ensemble_size"], 100, 1).unwrap(), 5);
    }

    #[test]
    fn test_reader_rejects_bad_values() {
        let params = Hyperparameters::new()
            .with("n_estimators", "many")
            .with("min_samples_split", 1_i64)
            .with("C", -1.0);
        let reader = ParamReader::new(&params, "test");

        assert!(matches!(
            reader.int_at_least(&["n_estimators"], 100, 1),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            reader.int_at_least(&["min_samples_split"], 2, 2),
            Err(Error::Validation(_))
        ));
        assert!(matches!(reader.positive_float(&["C"], 1.0), Err(Error::Validation(_))));
    }

    #[test]
    fn test_integral_float_accepted_as_int() {
        let params = Hyperparameters::new().with("max_iter", 250.0);
        let reader = ParamReader::new(&params, "linear");
        assert_eq!(reader.int_at_least(&["max_iter"], 1000, 1).unwrap(), 250);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: keys absent from the overlay are preserved verbatim
            #[test]
            fn prop_merge_preserves_untouched_keys(
                base in prop::collection::btree_map("[a-e]", -1000i64..1000, 0..5),
                overlay in prop::collection::btree_map("[c-h]", -1000i64..1000, 0..5),
            ) {
                let base_params: Hyperparameters = base.clone().into_iter().collect();
                let overlay_params: Hyperparameters = overlay.clone().into_iter().collect();
                let merged = base_params.merged(&overlay_params);

                for (key, value) in &base {
                    let expected = overlay.get(key).unwrap_or(value);
                    prop_assert_eq!(merged.get(key), Some(&HyperValue::Int(*expected)));
                }
                for (key, value) in &overlay {
                    prop_assert_eq!(merged.get(key), Some(&HyperValue::Int(*value)));
                }
            }
        }
    }
}
