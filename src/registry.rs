//! Model registry
//!
//! Static mapping from class name to backend factory. Built once through
//! [`ModelRegistryBuilder`] and read-only afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_mlops::{Hyperparameters, ModelRegistry};
//!
//! let registry = ModelRegistry::with_builtin_backends();
//! let model = registry.create("random_forest", &Hyperparameters::new())?;
//! assert_eq!(model.class_name(), "tree_ensemble");
//! assert!(registry.create("svm", &Hyperparameters::new()).is_err());
//! # Ok::<(), trueno_mlops::Error>(())
//! ```

use crate::backend::{linear, tree, LinearModel, ModelBackend, TreeEnsemble};
use crate::{Error, Hyperparameters, Result};
use rustc_hash::FxHashMap;
use std::fmt;

/// Constructs an untrained backend from a hyperparameter set.
pub type BackendFactory = fn(&Hyperparameters) -> Result<Box<dyn ModelBackend>>;

/// Read-only class-name → factory mapping.
#[derive(Clone)]
pub struct ModelRegistry {
    factories: FxHashMap<String, BackendFactory>,
}

impl ModelRegistry {
    /// Start an empty registry.
    #[must_use]
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Registry with `tree_ensemble`, `linear` and their aliases
    /// `random_forest` and `logistic_regression`.
    #[must_use]
    pub fn with_builtin_backends() -> Self {
        Self::builder()
            .register(tree::CLASS_NAME, TreeEnsemble::factory)
            .register("random_forest", TreeEnsemble::factory)
            .register(linear::CLASS_NAME, LinearModel::factory)
            .register("logistic_regression", LinearModel::factory)
            .build()
    }

    /// Instantiate an untrained backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownClass` if `class_name` is not registered, or
    /// `Error::Validation` if the factory rejects the hyperparameters.
    pub fn create(&self, class_name: &str, params: &Hyperparameters) -> Result<Box<dyn ModelBackend>> {
        let factory = self
            .factories
            .get(class_name)
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        factory(params)
    }

    /// Whether `class_name` is registered.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin_backends()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("classes", &self.class_names())
            .finish()
    }
}

/// Builder for [`ModelRegistry`].
#[derive(Default)]
pub struct ModelRegistryBuilder {
    factories: FxHashMap<String, BackendFactory>,
}

impl ModelRegistryBuilder {
    /// Register `factory` under `class_name`, replacing any previous entry.
    #[must_use]
    pub fn register(mut self, class_name: impl Into<String>, factory: BackendFactory) -> Self {
        self.factories.insert(class_name.into(), factory);
        self
    }

    /// Freeze the mapping.
    #[must_use]
    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            factories: self.factories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_class_names() {
        let registry = ModelRegistry::with_builtin_backends();
        assert_eq!(
            registry.class_names(),
            vec!["linear", "logistic_regression", "random_forest", "tree_ensemble"]
        );
        assert!(registry.contains("linear"));
        assert!(!registry.contains("svm"));
    }

    #[test]
    fn test_aliases_create_canonical_backends() {
        let registry = ModelRegistry::default();
        let params = Hyperparameters::new();
        assert_eq!(registry.create("random_forest", &params).unwrap().class_name(), "tree_ensemble");
        assert_eq!(registry.create("logistic_regression", &params).unwrap().class_name(), "linear");
    }

    #[test]
    fn test_unknown_class() {
        let registry = ModelRegistry::with_builtin_backends();
        let err = registry.create("svm", &Hyperparameters::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownClass(ref name) if name == "svm"));
    }

    #[test]
    fn test_factory_validates_hyperparameters() {
        let registry = ModelRegistry::with_builtin_backends();
        let params = Hyperparameters::new().with("n_estimators", "lots");
        assert!(matches!(
            registry.create("tree_ensemble", &params),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_custom_registry() {
        let registry = ModelRegistry::builder()
            .register("forest", TreeEnsemble::factory)
            .build();
        assert_eq!(registry.class_names(), vec!["forest"]);
        assert!(registry.create("linear", &Hyperparameters::new()).is_err());
    }
}
