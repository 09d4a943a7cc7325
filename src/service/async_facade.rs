//! Async facade over [`ModelLifecycleService`]
//!
//! Fitting and prediction are CPU-bound, so every call runs on tokio's
//! blocking pool instead of an async worker thread. A panic inside the
//! blocking call resumes on the awaiting task.

use super::{ModelLifecycleService, ModelSummary, TrainingReport};
use crate::backend::Predictions;
use crate::{Error, Hyperparameters, ModelId, Result};
use std::sync::Arc;

/// Cloneable async handle to a shared [`ModelLifecycleService`].
///
/// # Example
///
/// ```rust
/// use trueno_mlops::{AsyncLifecycle, Hyperparameters, ModelLifecycleService};
///
/// # #[tokio::main]
/// # async fn main() -> trueno_mlops::Result<()> {
/// let lifecycle = AsyncLifecycle::new(ModelLifecycleService::builder().build());
/// let id = lifecycle.create("linear", Hyperparameters::new()).await?;
/// assert!(!lifecycle.describe(id.to_string()).await?.trained);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AsyncLifecycle {
    inner: Arc<ModelLifecycleService>,
}

impl AsyncLifecycle {
    /// Wrap a service.
    #[must_use]
    pub fn new(service: ModelLifecycleService) -> Self {
        Self {
            inner: Arc::new(service),
        }
    }

    /// Wrap an already shared service.
    #[must_use]
    pub const fn from_shared(service: Arc<ModelLifecycleService>) -> Self {
        Self { inner: service }
    }

    /// The underlying service.
    #[must_use]
    pub fn service(&self) -> &ModelLifecycleService {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ModelLifecycleService) -> Result<T> + Send + 'static,
    {
        let service = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || f(&service)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::Io(std::io::Error::other(format!(
                "blocking task cancelled: {e}"
            )))),
        }
    }

    /// See [`ModelLifecycleService::create`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn create(&self, class_name: impl Into<String>, hyperparameters: Hyperparameters) -> Result<ModelId> {
        let class_name = class_name.into();
        self.run(move |s| s.create(&class_name, &hyperparameters)).await
    }

    /// See [`ModelLifecycleService::train`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn train(&self, model_id: impl Into<String>, dataset: impl Into<String>) -> Result<TrainingReport> {
        let (model_id, dataset) = (model_id.into(), dataset.into());
        self.run(move |s| s.train(&model_id, &dataset)).await
    }

    /// See [`ModelLifecycleService::retrain`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn retrain(
        &self,
        model_id: impl Into<String>,
        dataset: impl Into<String>,
        overrides: Option<Hyperparameters>,
    ) -> Result<TrainingReport> {
        let (model_id, dataset) = (model_id.into(), dataset.into());
        self.run(move |s| s.retrain(&model_id, &dataset, overrides.as_ref()))
            .await
    }

    /// See [`ModelLifecycleService::predict`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn predict(&self, model_id: impl Into<String>, features: Vec<Vec<f64>>) -> Result<Predictions> {
        let model_id = model_id.into();
        self.run(move |s| s.predict(&model_id, &features)).await
    }

    /// See [`ModelLifecycleService::delete`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn delete(&self, model_id: impl Into<String>) -> Result<()> {
        let model_id = model_id.into();
        self.run(move |s| s.delete(&model_id)).await
    }

    /// See [`ModelLifecycleService::describe`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn describe(&self, model_id: impl Into<String>) -> Result<ModelSummary> {
        let model_id = model_id.into();
        self.run(move |s| s.describe(&model_id)).await
    }

    /// See [`ModelLifecycleService::load`].
    ///
    /// # Errors
    ///
    /// Same as the blocking call.
    pub async fn load(&self, model_id: impl Into<String>, class_name: impl Into<String>) -> Result<ModelSummary> {
        let (model_id, class_name) = (model_id.into(), class_name.into());
        self.run(move |s| s.load(&model_id, &class_name)).await
    }

    /// See [`ModelLifecycleService::list`].
    pub async fn list(&self) -> Vec<ModelSummary> {
        self.run(|s| Ok(s.list())).await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{InMemoryDatasetProvider, TabularData};
    use crate::{ModelBackend, ModelRegistry};

    fn lifecycle() -> AsyncLifecycle {
        let datasets = Arc::new(InMemoryDatasetProvider::new());
        let rows = (0..40)
            .map(|i| {
                let x = f64::from(i);
                vec![x, 2.0 * x + 1.0]
            })
            .collect();
        datasets.insert("line", TabularData::from_rows(rows).unwrap());
        AsyncLifecycle::new(ModelLifecycleService::builder().datasets(datasets).build())
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let lifecycle = lifecycle();
        let params = Hyperparameters::new().with("task_type", "regression").with("C", 1e6);
        let id = lifecycle.create("linear", params).await.unwrap();

        let report = lifecycle.train(id.to_string(), "line").await.unwrap();
        assert!(report.metrics.get("r2_score").unwrap() > 0.999);

        let Predictions::Values(values) = lifecycle.predict(id.to_string(), vec![vec![10.0]]).await.unwrap() else {
            panic!("expected regression values");
        };
        assert!((values[0] - 21.0).abs() < 1e-3);

        lifecycle.delete(id.to_string()).await.unwrap();
        assert!(lifecycle.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_async_errors_propagate() {
        let lifecycle = lifecycle();
        assert!(matches!(
            lifecycle.predict("missing", vec![vec![1.0]]).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            lifecycle.create("svm", Hyperparameters::new()).await,
            Err(Error::UnknownClass(_))
        ));
    }

    fn exploding(_: &Hyperparameters) -> Result<Box<dyn ModelBackend>> {
        panic!("backend constructor exploded")
    }

    #[tokio::test]
    #[should_panic(expected = "backend constructor exploded")]
    async fn test_backend_panic_resumes_on_caller() {
        let registry = ModelRegistry::builder().register("exploding", exploding).build();
        let lifecycle = AsyncLifecycle::new(ModelLifecycleService::builder().registry(registry).build());
        let _ = lifecycle.create("exploding", Hyperparameters::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_async_trains() {
        let lifecycle = lifecycle();
        let id = lifecycle
            .create("linear", Hyperparameters::new().with("task_type", "regression"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                let id = id.to_string();
                tokio::spawn(async move { lifecycle.train(id, "line").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(lifecycle.describe(id.to_string()).await.unwrap().trained);
    }
}
