//! Model backends
//!
//! A backend is a concrete trainable/predictable implementation behind the
//! [`ModelBackend`] capability trait. The numerical fitting is delegated to
//! smartcore; the two variants shipped with the crate wrap its estimators:
//!
//! - [`TreeEnsemble`]: random forest (classification or regression)
//! - [`LinearModel`]: L2-penalised logistic regression / ridge regression
//!
//! Each backend owns its fitted state exclusively. [`ModelBackend::serialize`]
//! produces a format-versioned blob that only the same variant can read back.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_mlops::backend::{ModelBackend, Predictions, TreeEnsemble};
//! use trueno_mlops::Hyperparameters;
//!
//! let params = Hyperparameters::new()
//!     .with("task_type", "classification")
//!     .with("n_estimators", 10_i64);
//! let mut forest = TreeEnsemble::from_hyperparameters(&params)?;
//!
//! let x = vec![vec![0.0], vec![0.1], vec![0.2], vec![0.8], vec![0.9], vec![1.0]];
//! let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
//! let metrics = forest.train(&x, &y)?;
//! assert!(metrics.get("accuracy").is_some());
//!
//! let predictions = forest.predict(&[vec![0.95]])?;
//! assert_eq!(predictions, Predictions::Labels(vec![1]));
//! # Ok::<(), trueno_mlops::Error>(())
//! ```

mod envelope;
pub mod linear;
pub mod metrics;
pub mod tree;

pub use linear::{LinearModel, LinearModelConfig};
pub use metrics::TrainingMetrics;
pub use tree::{TreeEnsemble, TreeEnsembleConfig};

use crate::{Error, Hyperparameters, Result};
use serde::{Deserialize, Serialize};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::BTreeSet;
use std::fmt;

/// Capability contract shared by every model variant.
pub trait ModelBackend: Send + Sync + fmt::Debug {
    /// Canonical variant name (e.g. `tree_ensemble`).
    fn class_name(&self) -> &'static str;

    /// Fit on `features` / `labels`, replacing any previously fitted state.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` on row-count mismatch, empty or ragged
    /// input, non-finite cells, non-integral classification labels, or an
    /// unsupported task type.
    fn train(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<TrainingMetrics>;

    /// Predict one output per feature row.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotTrained` before a successful `train`, or
    /// `Error::Validation` if the row width differs from the fitted width.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Predictions>;

    /// Whether fitted state is present.
    fn is_trained(&self) -> bool;

    /// Construction-time hyperparameters with every default resolved.
    fn get_hyperparameters(&self) -> Hyperparameters;

    /// Canonical name of a recognized hyperparameter key or alias.
    fn canonical_key(&self, key: &str) -> Option<&'static str>;

    /// Encode the fitted state into an opaque, versioned blob.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    fn serialize(&self) -> Result<Vec<u8>>;

    /// Restore fitted state from a blob produced by [`ModelBackend::serialize`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the blob belongs to another variant or
    /// an unknown format version.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Learning task; selects the metric set and prediction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Discrete class labels, `accuracy` metric
    Classification,
    /// Continuous target, `mse` and `r2_score` metrics
    Regression,
}

impl TaskType {
    /// Parse a `task_type` hyperparameter value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for anything other than
    /// `classification` / `regression`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "classification" => Ok(Self::Classification),
            "regression" => Ok(Self::Regression),
            other => Err(Error::validation(format!(
                "Unsupported task_type '{other}' (expected 'classification' or 'regression')"
            ))),
        }
    }

    /// Hyperparameter spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Regression => "regression",
        }
    }
}

/// Model outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predictions {
    /// Class labels (classification)
    Labels(Vec<i64>),
    /// Continuous values (regression)
    Values(Vec<f64>),
}

impl Predictions {
    /// Number of predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Labels(v) => v.len(),
            Self::Values(v) => v.len(),
        }
    }

    /// Whether there are no predictions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check training input shape; returns the feature width.
pub(crate) fn validate_training_input(features: &[Vec<f64>], labels: &[f64]) -> Result<usize> {
    if features.len() != labels.len() {
        return Err(Error::validation(format!(
            "row count mismatch: {} feature rows, {} labels",
            features.len(),
            labels.len()
        )));
    }
    if features.is_empty() {
        return Err(Error::validation("training set is empty"));
    }
    let width = features[0].len();
    if width == 0 {
        return Err(Error::validation("training set has no feature columns"));
    }
    check_rows(features, width)?;
    if let Some(idx) = labels.iter().position(|v| !v.is_finite()) {
        return Err(Error::validation(format!("label {idx} is not finite")));
    }
    Ok(width)
}

/// Check that every row has `width` finite cells.
pub(crate) fn check_rows(features: &[Vec<f64>], width: usize) -> Result<()> {
    for (idx, row) in features.iter().enumerate() {
        if row.len() != width {
            return Err(Error::validation(format!(
                "row {idx} has {} features, expected {width}",
                row.len()
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::validation(format!("row {idx} contains non-finite values")));
        }
    }
    Ok(())
}

/// Row-major feature rows as a smartcore matrix. `rows` must be non-empty.
pub(crate) fn to_matrix(rows: &[Vec<f64>]) -> DenseMatrix<f64> {
    DenseMatrix::from_2d_vec(&rows.to_vec())
}

/// Report an estimator failure as a validation error on the input.
pub(crate) fn backend_failure(class_name: &str, error: &Failed) -> Error {
    Error::validation(format!("{class_name} backend rejected the data: {error}"))
}

/// Convert classification targets to integer labels; returns `(labels, sorted classes)`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn class_labels(labels: &[f64]) -> Result<(Vec<i64>, Vec<i64>)> {
    let mut out = Vec::with_capacity(labels.len());
    for (idx, value) in labels.iter().enumerate() {
        if value.fract() != 0.0 || value.abs() > 2f64.powi(53) {
            return Err(Error::validation(format!(
                "classification label {idx} ({value}) is not an integer class"
            )));
        }
        out.push(*value as i64);
    }
    let classes: Vec<i64> = out.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    Ok((out, classes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_parse() {
        assert_eq!(TaskType::parse("classification").unwrap(), TaskType::Classification);
        assert_eq!(TaskType::parse("regression").unwrap(), TaskType::Regression);
        let err = TaskType::parse("ranking").unwrap_err();
        assert!(err.to_string().contains("Unsupported task_type"));
    }

    #[test]
    fn test_validate_training_input() {
        assert_eq!(validate_training_input(&[vec![1.0, 2.0]], &[0.0]).unwrap(), 2);
        assert!(validate_training_input(&[vec![1.0]], &[0.0, 1.0]).is_err());
        assert!(validate_training_input(&[], &[]).is_err());
        assert!(validate_training_input(&[vec![1.0], vec![1.0, 2.0]], &[0.0, 1.0]).is_err());
        assert!(validate_training_input(&[vec![f64::NAN]], &[0.0]).is_err());
        assert!(validate_training_input(&[vec![1.0]], &[f64::INFINITY]).is_err());
    }

    #[test]
    fn test_class_labels() {
        let (labels, classes) = class_labels(&[2.0, -1.0, 2.0, 0.0]).unwrap();
        assert_eq!(labels, vec![2, -1, 2, 0]);
        assert_eq!(classes, vec![-1, 0, 2]);
        assert!(matches!(class_labels(&[0.5]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_to_matrix_keeps_row_layout() {
        use smartcore::linalg::basic::arrays::Array;

        let m = to_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(m.shape(), (3, 2));
        assert!((*m.get((2, 0)) - 5.0).abs() < f64::EPSILON);
        assert!((*m.get((0, 1)) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_predictions_len() {
        assert_eq!(Predictions::Labels(vec![1, 2]).len(), 2);
        assert!(Predictions::Values(vec![]).is_empty());
    }
}
