//! Tree ensemble backend
//!
//! Wraps smartcore's random forests: `RandomForestClassifier` for
//! classification and `RandomForestRegressor` for regression. Each tree is
//! grown on a bootstrap sample with a random feature subset per split.
//!
//! Fits are deterministic: the forest RNG is always seeded with `SEED`.

use super::{
    backend_failure, check_rows, class_labels, envelope, to_matrix, validate_training_input,
    ModelBackend, Predictions, TaskType, TrainingMetrics,
};
use crate::hyperparams::{canonical_key, ParamReader};
use crate::{Error, HyperValue, Hyperparameters, Result};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Registry name of this backend.
pub const CLASS_NAME: &str = "tree_ensemble";

const FORMAT_VERSION: u32 = 1;
const SEED: u64 = 42;

/// Resolved tree-ensemble hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEnsembleConfig {
    /// `classification` or `regression`, checked at train time
    pub task_type: String,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum rows required to split a node
    pub min_samples_split: usize,
}

impl Default for TreeEnsembleConfig {
    fn default() -> Self {
        Self {
            task_type: TaskType::Classification.as_str().to_string(),
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl TreeEnsembleConfig {
    const TASK_TYPE: &'static [&'static str] = &["task_type"];
    const N_ESTIMATORS: &'static [&'static str] = &["n_estimators", "ensemble_size"];
    const MAX_DEPTH: &'static [&'static str] = &["max_depth"];
    const MIN_SAMPLES_SPLIT: &'static [&'static str] = &["min_samples_split", "min_split"];
    const KEYS: &'static [&'static [&'static str]] =
        &[Self::TASK_TYPE, Self::N_ESTIMATORS, Self::MAX_DEPTH, Self::MIN_SAMPLES_SPLIT];

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
            n_estimators: reader.int_at_least(Self::N_ESTIMATORS, defaults.n_estimators, 1)?,
            max_depth: reader.optional_int_at_least(Self::MAX_DEPTH, 1)?,
            min_samples_split: reader.int_at_least(
                Self::MIN_SAMPLES_SPLIT,
                defaults.min_samples_split,
                2,
            )?,
        })
    }

    /// Canonical hyperparameter set.
    #[must_use]
    pub fn to_hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::new()
            .with("task_type", self.task_type.as_str())
            .with("n_estimators", self.n_estimators)
            .with("max_depth", self.max_depth.map_or(HyperValue::Null, HyperValue::from))
            .with("min_samples_split", self.min_samples_split)
    }
}

type Matrix = DenseMatrix<f64>;

/// Fitted smartcore forest for one task.
#[derive(Debug, Serialize, Deserialize)]
enum Forest {
    Classifier(RandomForestClassifier<f64, i64, Matrix, Vec<i64>>),
    Regressor(RandomForestRegressor<f64, f64, Matrix, Vec<f64>>),
}

#[derive(Debug, Serialize, Deserialize)]
struct FittedForest {
    n_features: usize,
    forest: Forest,
}

impl FittedForest {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Predictions> {
        let x = to_matrix(features);
        match &self.forest {
            Forest::Classifier(model) => model
                .predict(&x)
                .map(Predictions::Labels)
                .map_err(|e| backend_failure(CLASS_NAME, &e)),
            Forest::Regressor(model) => model
                .predict(&x)
                .map(Predictions::Values)
                .map_err(|e| backend_failure(CLASS_NAME, &e)),
        }
    }
}

/// Narrow a count to the integer width the forest parameters use.
fn narrow<T: TryFrom<usize>>(name: &str, value: usize) -> Result<T> {
    T::try_from(value).map_err(|_| Error::validation(format!("{name} = {value} is out of range")))
}

/// Random forest over smartcore's classifier and regressor.
#[derive(Debug)]
pub struct TreeEnsemble {
    config: TreeEnsembleConfig,
    fitted: Option<FittedForest>,
}

impl TreeEnsemble {
    /// Create an untrained forest.
    #[must_use]
    pub const fn new(config: TreeEnsembleConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Create an untrained forest from a hyperparameter set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for malformed hyperparameters.
    pub fn from_hyperparameters(params: &Hyperparameters) -> Result<Self> {
        Ok(Self::new(TreeEnsembleConfig::from_hyperparameters(params)?))
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
    pub const fn config(&self) -> &TreeEnsembleConfig {
        &self.config
    }

    fn classifier_parameters(&self) -> Result<RandomForestClassifierParameters> {
        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(narrow("n_estimators", self.config.n_estimators)?)
            .with_min_samples_split(self.config.min_samples_split)
            .with_seed(SEED);
        if let Some(depth) = self.config.max_depth {
            params = params.with_max_depth(narrow("max_depth", depth)?);
        }
        Ok(params)
    }

    fn regressor_parameters(&self) -> Result<RandomForestRegressorParameters> {
        let mut params = RandomForestRegressorParameters::default()
            .with_n_trees(narrow("n_estimators", self.config.n_estimators)?)
            .with_min_samples_split(self.config.min_samples_split)
            .with_seed(SEED);
        if let Some(depth) = self.config.max_depth {
            params = params.with_max_depth(narrow("max_depth", depth)?);
        }
        Ok(params)
    }

    fn fit_classifier(&self, features: &[Vec<f64>], labels: &[f64]) -> Result<(Forest, TrainingMetrics)> {
        let (y, classes) = class_labels(labels)?;
        if classes.len() < 2 {
            return Err(Error::validation(
                "tree ensemble classification needs at least two distinct classes",
            ));
        }
        let x = to_matrix(features);
        let model = RandomForestClassifier::fit(&x, &y, self.classifier_parameters()?)
            .map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let fitted = model.predict(&x).map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let metrics = TrainingMetrics::classification(&y, &fitted);
        Ok((Forest::Classifier(model), metrics))
    }

    fn fit_regressor(&self, features: &[Vec<f64>], labels: &[f64]) -> Result<(Forest, TrainingMetrics)> {
        let x = to_matrix(features);
        let y = labels.to_vec();
        let model = RandomForestRegressor::fit(&x, &y, self.regressor_parameters()?)
            .map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let fitted = model.predict(&x).map_err(|e| backend_failure(CLASS_NAME, &e))?;
        let metrics = TrainingMetrics::regression(labels, &fitted);
        Ok((Forest::Regressor(model), metrics))
    }
}

impl ModelBackend for TreeEnsemble {
    fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    fn train(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<TrainingMetrics> {
        let task = TaskType::parse(&self.config.task_type)?;
        let n_features = validate_training_input(features, labels)?;

        let (forest, metrics) = match task {
            TaskType::Classification => self.fit_classifier(features, labels)?,
            TaskType::Regression => self.fit_regressor(features, labels)?,
        };

        tracing::debug!(
            task = task.as_str(),
            trees = self.config.n_estimators,
            rows = features.len(),
            "tree ensemble fitted"
        );
        self.fitted = Some(FittedForest { n_features, forest });
        Ok(metrics)
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Predictions> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| Error::NotTrained(CLASS_NAME.to_string()))?;
        if features.is_empty() {
            return Ok(match fitted.forest {
                Forest::Classifier(_) => Predictions::Labels(Vec::new()),
                Forest::Regressor(_) => Predictions::Values(Vec::new()),
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
        canonical_key(TreeEnsembleConfig::KEYS, key)
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        envelope::encode(CLASS_NAME, FORMAT_VERSION, &self.fitted)
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        self.fitted = envelope::decode(CLASS_NAME, FORMAT_VERSION, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two well separated blobs: label = 1 when x0 + x1 > 1.
    #[allow(clippy::cast_precision_loss)]
    fn blobs(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(7);
        let x: Vec<Vec<f64>> = (0..n).map(|_| vec![rng.gen::<f64>(), rng.gen::<f64>()]).collect();
        let y = x.iter().map(|r| if r[0] + r[1] > 1.0 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    fn forest(params: &[(&str, HyperValue)]) -> TreeEnsemble {
        let params: Hyperparameters = params.iter().cloned().collect();
        TreeEnsemble::from_hyperparameters(&params).unwrap()
    }

    #[test]
    fn test_defaults_resolved() {
        let model = forest(&[]);
        let params = model.get_hyperparameters();
        assert_eq!(params.get("task_type"), Some(&HyperValue::from("classification")));
        assert_eq!(params.get("n_estimators"), Some(&HyperValue::Int(100)));
        assert_eq!(params.get("max_depth"), Some(&HyperValue::Null));
        assert_eq!(params.get("min_samples_split"), Some(&HyperValue::Int(2)));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_aliases_resolve_to_canonical_keys() {
        let model = forest(&[("ensemble_size", 7_i64.into()), ("min_split", 4_i64.into())]);
        let params = model.get_hyperparameters();
        assert_eq!(params.get("n_estimators"), Some(&HyperValue::Int(7)));
        assert_eq!(params.get("min_samples_split"), Some(&HyperValue::Int(4)));
        assert!(!params.contains_key("ensemble_size"));
        assert_eq!(model.canonical_key("ensemble_size"), Some("n_estimators"));
        assert_eq!(model.canonical_key("max_depth"), Some("max_depth"));
        assert_eq!(model.canonical_key("learning_rate"), None);
    }

    #[test]
    fn test_predict_before_train_fails() {
        let model = forest(&[]);
        assert!(matches!(model.predict(&[vec![1.0]]), Err(Error::NotTrained(_))));
    }

    #[test]
    fn test_classification_fit() {
        let (x, y) = blobs(200);
        let mut model = forest(&[("n_estimators", 15_i64.into())]);
        let metrics = model.train(&x, &y).unwrap();

        let accuracy = metrics.get("accuracy").unwrap();
        assert!(accuracy > 0.9, "training accuracy {accuracy}");
        assert_eq!(
            model.predict(&[vec![0.05, 0.05], vec![0.95, 0.95]]).unwrap(),
            Predictions::Labels(vec![0, 1])
        );
    }

    #[test]
    fn test_regression_fit() {
        let x: Vec<Vec<f64>> = (0..100).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..100).map(|i| 3.0 * f64::from(i) + 1.0).collect();
        let mut model = forest(&[("task_type", "regression".into()), ("n_estimators", 10_i64.into())]);

        let metrics = model.train(&x, &y).unwrap();
        assert!(metrics.get("mse").unwrap() >= 0.0);
        assert!(metrics.get("r2_score").unwrap() > 0.95);

        let Predictions::Values(pred) = model.predict(&[vec![50.0]]).unwrap() else {
            panic!("expected values");
        };
        assert!((pred[0] - 151.0).abs() < 15.0, "prediction {}", pred[0]);
    }

    #[test]
    fn test_max_depth_limits_fit() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..64).map(|i| if (16..48).contains(&i) { 1.0 } else { 0.0 }).collect();
        let mut shallow = forest(&[("n_estimators", 5_i64.into()), ("max_depth", 1_i64.into())]);
        let mut deep = forest(&[("n_estimators", 5_i64.into())]);

        let shallow_acc = shallow.train(&x, &y).unwrap().get("accuracy").unwrap();
        let deep_acc = deep.train(&x, &y).unwrap().get("accuracy").unwrap();
        assert!(shallow_acc < deep_acc, "depth 1 {shallow_acc} vs unbounded {deep_acc}");
    }

    #[test]
    fn test_unsupported_task_type_fails_at_train() {
        let mut model = forest(&[("task_type", "clustering".into())]);
        let result = model.train(&[vec![1.0]], &[1.0]);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_non_integral_class_label_rejected() {
        let mut model = forest(&[]);
        let result = model.train(&[vec![1.0], vec![2.0]], &[0.0, 0.5]);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_single_class_rejected() {
        let mut model = forest(&[("n_estimators", 3_i64.into())]);
        let result = model.train(&[vec![1.0], vec![2.0]], &[4.0, 4.0]);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = blobs(80);
        let mut a = forest(&[("n_estimators", 5_i64.into())]);
        let mut b = forest(&[("n_estimators", 5_i64.into())]);
        a.train(&x, &y).unwrap();
        b.train(&x, &y).unwrap();
        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (x, y) = blobs(20);
        let mut model = forest(&[("n_estimators", 2_i64.into())]);
        model.train(&x, &y).unwrap();
        assert!(matches!(model.predict(&[vec![1.0]]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_serialize_round_trip_predictions() {
        let (x, y) = blobs(60);
        let mut model = forest(&[("n_estimators", 4_i64.into())]);
        model.train(&x, &y).unwrap();

        let mut restored = forest(&[("n_estimators", 4_i64.into())]);
        restored.deserialize(&model.serialize().unwrap()).unwrap();
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
        assert_eq!(restored.predict(&[]).unwrap(), Predictions::Labels(vec![]));
    }

    #[test]
    fn test_untrained_blob_round_trip() {
        let model = forest(&[]);
        let mut restored = forest(&[]);
        restored.deserialize(&model.serialize().unwrap()).unwrap();
        assert!(!restored.is_trained());
    }
}
