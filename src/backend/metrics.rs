//! Training metrics
//!
//! Classification reports `accuracy`; regression reports `mse` and `r2_score`.
//! All metrics are computed on the training set after fitting, using
//! `smartcore::metrics`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from metric name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingMetrics(BTreeMap<String, f64>);

impl TrainingMetrics {
    /// Create an empty metric set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a metric.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Look up a metric.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Iterate metrics in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no metrics were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `{"accuracy": ..}` for class predictions.
    #[must_use]
    pub fn classification(y_true: &[i64], y_pred: &[i64]) -> Self {
        let mut metrics = Self::new();
        metrics.insert("accuracy", accuracy(y_true, y_pred));
        metrics
    }

    /// `{"mse": .., "r2_score": ..}` for continuous predictions.
    #[must_use]
    pub fn regression(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut metrics = Self::new();
        metrics.insert("mse", mean_squared_error(y_true, y_pred));
        metrics.insert("r2_score", r2_score(y_true, y_pred));
        metrics
    }
}

impl fmt::Display for TrainingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value:.6}")?;
        }
        f.write_str("}")
    }
}

/// Fraction of exact matches, in `[0, 1]`. Empty input yields 0.
#[must_use]
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    smartcore::metrics::accuracy(&y_true.to_vec(), &y_pred.to_vec())
}

/// Mean squared error, `>= 0`. Empty input yields 0.
#[must_use]
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    smartcore::metrics::mean_squared_error(&y_true.to_vec(), &y_pred.to_vec())
}

/// Coefficient of determination.
///
/// A constant target gives 1.0 for a perfect fit and 0.0 otherwise.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let Some(first) = y_true.first() else {
        return 0.0;
    };
    if y_true.iter().all(|v| v == first) {
        let perfect = y_true.iter().zip(y_pred).all(|(a, b)| a == b);
        return if perfect { 1.0 } else { 0.0 };
    }
    smartcore::metrics::r2(&y_true.to_vec(), &y_pred.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert!((accuracy(&[1, 0, 1, 1], &[1, 1, 1, 0]) - 0.5).abs() < 1e-12);
        assert!((accuracy(&[], &[]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mse_and_r2() {
        let y = [1.0, 2.0, 3.0];
        assert!(mean_squared_error(&y, &y).abs() < f64::EPSILON);
        assert!((r2_score(&y, &y) - 1.0).abs() < f64::EPSILON);

        let mean_pred = [2.0, 2.0, 2.0];
        assert!((r2_score(&y, &mean_pred) - 0.0).abs() < 1e-12);
        assert!((mean_squared_error(&y, &mean_pred) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_r2_constant_target() {
        assert!((r2_score(&[4.0, 4.0], &[4.0, 4.0]) - 1.0).abs() < f64::EPSILON);
        assert!((r2_score(&[4.0, 4.0], &[4.0, 5.0]) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_sets() {
        let c = TrainingMetrics::classification(&[1, 2], &[1, 2]);
        assert_eq!(c.get("accuracy"), Some(1.0));
        assert_eq!(c.len(), 1);

        let r = TrainingMetrics::regression(&[1.0, 3.0], &[1.0, 3.0]);
        assert_eq!(r.get("mse"), Some(0.0));
        assert_eq!(r.get("r2_score"), Some(1.0));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: accuracy stays within [0, 1]
            #[test]
            fn prop_accuracy_bounded(
                pairs in prop::collection::vec((0i64..4, 0i64..4), 0..200)
            ) {
                let (t, p): (Vec<i64>, Vec<i64>) = pairs.into_iter().unzip();
                let acc = accuracy(&t, &p);
                prop_assert!((0.0..=1.0).contains(&acc));
            }

            /// Property: mse is non-negative and r2 never exceeds 1
            #[test]
            fn prop_regression_metrics_bounds(
                pairs in prop::collection::vec((-1e3f64..1e3, -1e3f64..1e3), 1..200)
            ) {
                let (t, p): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
                prop_assert!(mean_squared_error(&t, &p) >= 0.0);
                prop_assert!(r2_score(&t, &p) <= 1.0 + 1e-12);
            }
        }
    }
}
