//! Linear backend
//!
//! - Classification: smartcore `LogisticRegression` (binary, or multinomial
//!   for more than two classes).
//! - Regression: smartcore `RidgeRegression` fitted on centred data, so the
//!   intercept is unpenalised.
//!
//! `C` is the inverse regularisation strength for both tasks (smartcore
//! `alpha = 1 / C`). `max_iter` is part of the resolved hyperparameters only;
//! the smartcore solvers apply their own iteration caps.

use super::{
    backend_failure, check_rows, class_labels, envelope, to_matrix, validate_training_input,
    ModelBackend, Predictions, TaskType, TrainingMetrics,
};
use crate::hyperparams::{canonical_key, ParamReader};
use crate::{Error, Hyperparameters, Result};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};

/// Registry name of this backend.
pub const CLASS_NAME: &str = "linear";

const FORMAT_VERSION: u32 = 1;

/// Resolved linear-model hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModelConfig {
    /// `classification` or `regression`, checked at train time
    pub task_type: String,
    /// Inverse regularisation strength (> 0)
    pub c: f64,
    /// Iteration cap recorded with the model
    pub max_iter: usize,
}

impl Default for LinearModelConfig {
    fn default() -> Self {
        Self {
            task_type: TaskType::Classification.as_str().to_string(),
            c: 1.0,
            max_iter: 1000,
        }
    }
}

impl LinearModelConfig {
    const TASK_TYPE: &'static [&'static str] = &["task_type"];
    const C: &'static [&'static str] = &["C", "regularization_strength"];
    const MAX_ITER: &'static [&'static str] = &["max_iter", "max_iterations"];
    const KEYS: &'static [&'static [&'static str]] = &[Self::TASK_TYPE, Self::C, Self::MAX_ITER];

    /// Resolve a hyperparameter set, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for values of the wrong type or range.
    pub fn from_hyperparameters(params: &Hyperparameters) -> Result<Self> {
        let reader = ParamReader::new(params, CLASS_NAME);
        reader.warn_unrecognized(&Self::KEYS.concat());
        let defaults = Self::default();
        Ok(Self {
            task_type: reader.string(Self::TASK_TYPE, &defaults.task_type)?,
            c: reader.positive_float(Self::C, defaults.c)?,
            max_iter: reader.int_at_least(Self::MAX_ITER, defaults.max_iter, 1)?,
        })
    }

    /// Canonical hyperparameter set.
    #[must_use]
    pub fn to_hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::new()
            .with("task_type", self.task_type.as_str())
            .with("C", self.c)
            .with("max_iter", self.max_iter)
    }
}

type Matrix = DenseMatrix<f64>;

#[derive(Debug, Serialize, Deserialize)]
enum Estimator {
    Logistic(LogisticRegression<f64, i64, Matrix, Vec<i64>>),
    Ridge {
        model: RidgeRegression<f64, f64, Matrix, Vec<f64>>,
        x_mean: Vec<f64>,
        y_mean: f64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct FittedLinear {
    n_features: usize,
    estimator: Estimator,
}

impl FittedLinear {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Predictions> {
        match &self.estimator {
            Estimator::Logistic(model) => model
                .predict(&to_matrix(features))
                .map(Predictions::Labels)
                .map_err(|e| backend_failure(CLASS_NAME, &e)),
            Estimator::Ridge {
                model,
                x_mean,
                y_mean,
            } => {
                let centred = model
                    .predict(&to_matrix(&centre(features, x_mean)))
                    .map_err(|e| backend_failure(CLASS_NAME, &e))?;
                Ok(Predictions::Values(centred.into_iter().map(|v| v + y_mean).collect()))
            }
        }
    }

    const fn is_classifier(&self) -> bool {
        matches!(self.estimator, Estimator::Logistic(_))
    }
}

#[allow(clippy::cast_precision_loss)]
fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let n = rows.len() as f64;
    let mut means = vec![0.0; rows[0].len()];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    means
}

fn centre(rows: &[Vec<f64>], means: &[f64]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| row.iter().zip(means).map(|(v, m)| v - m).collect())
        .collect()
}

/// L2-penalised linear model.
#[derive(Debug)]
pub struct LinearModel {
    config: LinearModelConfig,
    fitted: Option<FittedLinear>,
}

impl LinearModel {
    /// Create an untrained model.
    #[must_use]
    pub const fn new(config: LinearModelConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Create an untrained model from a hyperparameter set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for malformed hyperparameters.
    pub fn from_hyperparameters(params: &Hyperparameters) -> Result<Self> {
        Ok(Self::new(LinearModelConfig::from_hyperparameters(params)?))
    }

    /// Registry factory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for malformed hyperparameters.
    pub fn factory(params: &Hyperparameters) -> Result<Box<dyn ModelBackend>> {
        Ok(Box::new(Self::from_hyperparameters(params)?))
    }

    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &LinearModelConfig {
        &self.config
    }

    fn alpha(&self) -> f64 {
        1.0 / self.config.c
    }

    fn fit_classifier(&self, features: &[Vec<f64>], labels: &[f64]) -> Result<(Estimator, TrainingMetrics)> {
        let (y, classes) = class_labels(labels)?;
        if classes.len() < 2 {
            return Err(Error::validation(
                "linear classification needs at least two distinct classes",
            ));
        }
        let x = to_matrix(features);
        let params = LogisticRegressionParameters::default().with_alpha(self.alpha());
        let model = LogisticRegression::fit(&x, &y, params).map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let fitted = model.predict(&x).map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let metrics = TrainingMetrics::classification(&y, &fitted);
        Ok((Estimator::Logistic(model), metrics))
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit_regressor(&self, features: &[Vec<f64>], labels: &[f64]) -> Result<(Estimator, TrainingMetrics)> {
        let x_mean = column_means(features);
        let y_mean = labels.iter().sum::<f64>() / labels.len() as f64;
        let y: Vec<f64> = labels.iter().map(|v| v - y_mean).collect();

        let params = RidgeRegressionParameters::default()
            .with_alpha(self.alpha())
            .with_solver(RidgeRegressionSolverName::Cholesky)
            .with_normalize(false);
        let x = to_matrix(&centre(features, &x_mean));
        let model = RidgeRegression::fit(&x, &y, params).map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let fitted: Vec<f64> = model
            .predict(&x)
            .map_err(|e| backend_failure(CLASS_NAME, &e))?
            .into_iter()
            .map(|v| v + y_mean)
            .collect();
        let metrics = TrainingMetrics::regression(labels, &fitted);
        Ok((
            Estimator::Ridge {
                model,
                x_mean,
                y_mean,
            },
            metrics,
        ))
    }
}

impl ModelBackend for LinearModel {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn train(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<TrainingMetrics> {
        let task = TaskType::parse(&self.config.task_type)?;
        let n_features = validate_training_input(features, labels)?;

        let (estimator, metrics) = match task {
            TaskType::Classification => self.fit_classifier(features, labels)?,
            TaskType::Regression => self.fit_regressor(features, labels)?,
        };
        tracing::debug!(
            task = task.as_str(),
            alpha = self.alpha(),
            rows = features.len(),
            "linear model fitted"
        );
        self.fitted = Some(FittedLinear {
            n_features,
            estimator,
        });
        Ok(metrics)
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Predictions> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| Error::NotTrained(CLASS_NAME.to_string()))?;
        if features.is_empty() {
            return Ok(if fitted.is_classifier() {
                Predictions::Labels(Vec::new())
            } else {
                Predictions::Values(Vec::new())
            });
        }
        check_rows(features, fitted.n_features)?;
        fitted.predict(features)
    }

    fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    fn get_hyperparameters(&self) -> Hyperparameters {
        self.config.to_hyperparameters()
    }

    fn canonical_key(&self, key: &str) -> Option<&'static str> {
        canonical_key(LinearModelConfig::KEYS, key)
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        envelope::encode(CLASS_NAME, FORMAT_VERSION, &self.fitted)
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        self.fitted = envelope::decode(CLASS_NAME, FORMAT_VERSION, bytes)?;
        Ok(())
    }
}
