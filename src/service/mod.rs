//! Model lifecycle service
//!
//! Toyota Way: Jidoka - a failed fit never replaces a working model
//!
//! [`ModelLifecycleService`] owns the in-memory instance table and drives
//! every lifecycle transition:
//!
//! ```text
//! Created --train--> Trained --retrain--> Trained
//! Created | Trained --delete--> Deleted (terminal)
//! ```
//!
//! ## Concurrency
//!
//! Each model has two locks. The operation lock serializes mutating calls
//! (train, retrain, load, delete) on that id and is held through the snapshot
//! write, so the persisted snapshot always reflects exactly one completed
//! call. The state lock is taken only to swap in a freshly fitted backend and
//! for `predict`, so predictions keep flowing while a retrain is fitting.
//! Different ids never block each other.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_mlops::dataset::{InMemoryDatasetProvider, TabularData};
//! use trueno_mlops::{Hyperparameters, ModelLifecycleService, Predictions};
//!
//! let datasets = Arc::new(InMemoryDatasetProvider::new());
//! datasets.insert(
//!     "threshold",
//!     TabularData::from_rows(vec![
//!         vec![0.0, 0.0],
//!         vec![0.1, 0.0],
//!         vec![0.9, 1.0],
//!         vec![1.0, 1.0],
//!     ])?,
//! );
//!
//! let service = ModelLifecycleService::builder().datasets(datasets).build();
//! let id = service.create("linear", &Hyperparameters::new().with("C", 10.0))?;
//! let report = service.train(&id, "threshold")?;
//! assert_eq!(report.metrics.get("accuracy"), Some(1.0));
//!
//! let predictions = service.predict(&id, &[vec![0.95]])?;
//! assert_eq!(predictions, Predictions::Labels(vec![1]));
//! # Ok::<(), trueno_mlops::Error>(())
//! ```

#[cfg(feature = "tokio")]
mod async_facade;

#[cfg(feature = "tokio")]
pub use async_facade::AsyncLifecycle;

use crate::backend::{ModelBackend, Predictions, TrainingMetrics};
use crate::collaborator::{ArtifactMetadata, ArtifactSink, ExperimentLogger, Outcome, SideEffects};
use crate::config::ServiceConfig;
use crate::dataset::{DatasetProvider, FileDatasetProvider, InMemoryDatasetProvider};
use crate::persistence::{FileSnapshotStore, MemorySnapshotStore, PersistenceStore, Snapshot};
use crate::{Error, Hyperparameters, ModelId, ModelRegistry, Result};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Public view of one model instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model id
    pub id: ModelId,
    /// Class name the instance was created or loaded with
    pub class_name: String,
    /// Whether the instance has a fitted model
    pub trained: bool,
    /// Resolved hyperparameters
    pub hyperparameters: Hyperparameters,
    /// Metrics of the most recent fit in this process
    pub metrics: Option<TrainingMetrics>,
    /// Time of the most recent fit
    pub trained_at: Option<DateTime<Utc>>,
}

/// Result of a `train` / `retrain` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Model id
    pub model_id: ModelId,
    /// Training-set metrics
    pub metrics: TrainingMetrics,
    /// Hyperparameters the model was fitted with
    pub hyperparameters: Hyperparameters,
    /// Outcome of the snapshot write and collaborator calls
    pub side_effects: SideEffects,
}

struct ModelState {
    class_name: String,
    backend: Box<dyn ModelBackend>,
    metrics: Option<TrainingMetrics>,
    trained_at: Option<DateTime<Utc>>,
}

impl ModelState {
    fn summary(&self, id: &ModelId) -> ModelSummary {
        ModelSummary {
            id: id.clone(),
            class_name: self.class_name.clone(),
            trained: self.backend.is_trained(),
            hyperparameters: self.backend.get_hyperparameters(),
            metrics: self.metrics.clone(),
            trained_at: self.trained_at,
        }
    }
}

struct ModelEntry {
    /// Creation order, for `list`
    seq: u64,
    op_lock: Mutex<()>,
    state: RwLock<ModelState>,
    /// Set by `delete` under `op_lock`; a waiting mutator must not proceed
    deleted: AtomicBool,
}

/// Lifecycle orchestrator over a registry, a snapshot store and a dataset
/// provider.
pub struct ModelLifecycleService {
    registry: ModelRegistry,
    store: Arc<dyn PersistenceStore>,
    datasets: Arc<dyn DatasetProvider>,
    artifact_sink: Option<Arc<dyn ArtifactSink>>,
    experiment_logger: Option<Arc<dyn ExperimentLogger>>,
    models: DashMap<ModelId, Arc<ModelEntry>>,
    next_seq: AtomicU64,
}

impl fmt::Debug for ModelLifecycleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLifecycleService")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("models", &self.models.len())
            .field("artifact_sink", &self.artifact_sink.is_some())
            .field("experiment_logger", &self.experiment_logger.is_some())
            .finish_non_exhaustive()
    }
}

impl ModelLifecycleService {
    /// Start building a service.
    #[must_use]
    pub fn builder() -> ModelLifecycleServiceBuilder {
        ModelLifecycleServiceBuilder::default()
    }

    /// Service with file-backed snapshots under `config.models_dir` and
    /// datasets under `config.datasets_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if either directory cannot be created.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store = FileSnapshotStore::open(&config.models_dir)?
            .with_compression(config.persistence.compression);
        let datasets = FileDatasetProvider::open(&config.datasets_dir)?;
        Ok(Self::builder()
            .store(Arc::new(store))
            .datasets(Arc::new(datasets))
            .build())
    }

    /// Class names accepted by [`create`](Self::create), sorted.
    #[must_use]
    pub fn available_classes(&self) -> Vec<String> {
        self.registry.class_names()
    }

    /// Create an untrained instance.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownClass` for an unregistered class, or
    /// `Error::Validation` for malformed hyperparameters.
    pub fn create(&self, class_name: &str, hyperparameters: &Hyperparameters) -> Result<ModelId> {
        let backend = self.registry.create(class_name, hyperparameters)?;
        let id = ModelId::generate();
        let entry = self.new_entry(ModelState {
            class_name: class_name.to_string(),
            backend,
            metrics: None,
            trained_at: None,
        });
        self.models.insert(id.clone(), Arc::new(entry));
        info!(model_id = %id, class_name, "model created");
        Ok(id)
    }

    /// Fit the model on `dataset` with its current hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown model or dataset, or
    /// `Error::Validation` if the data is rejected. Persistence and
    /// collaborator failures are reported in the returned
    /// [`TrainingReport::side_effects`] instead.
    pub fn train(&self, model_id: &str, dataset: &str) -> Result<TrainingReport> {
        let (id, entry) = self.entry(model_id)?;
        let _op = entry.op_lock.lock();
        Self::ensure_live(&id, &entry)?;

        let (class_name, params) = {
            let state = entry.state.read();
            (state.class_name.clone(), state.backend.get_hyperparameters())
        };
        info!(model_id = %id, class_name = %class_name, dataset, "training model");
        self.fit_and_commit(&id, &entry, &class_name, dataset, &params)
    }

    /// Refit from scratch with `overrides` shallow-merged onto the current
    /// hyperparameters.
    ///
    /// Alias keys in `overrides` are mapped to their canonical names first.
    /// If the fit fails, the previous model and hyperparameters stay in place.
    ///
    /// # Errors
    ///
    /// Same as [`train`](Self::train), plus `Error::Validation` for malformed
    /// overrides.
    pub fn retrain(
        &self,
        model_id: &str,
        dataset: &str,
        overrides: Option<&Hyperparameters>,
    ) -> Result<TrainingReport> {
        let (id, entry) = self.entry(model_id)?;
        let _op = entry.op_lock.lock();
        Self::ensure_live(&id, &entry)?;

        let (class_name, params) = {
            let state = entry.state.read();
            let current = state.backend.get_hyperparameters();
            let merged = match overrides {
                Some(overrides) => {
                    let canonical: Hyperparameters = overrides
                        .iter()
                        .map(|(key, value)| {
                            let key = state.backend.canonical_key(key).unwrap_or(key);
                            (key.to_string(), value.clone())
                        })
                        .collect();
                    current.merged(&canonical)
                }
                None => current,
            };
            (state.class_name.clone(), merged)
        };
        info!(
            model_id = %id,
            class_name = %class_name,
            dataset,
            hyperparameters = %params,
            "retraining model"
        );
        self.fit_and_commit(&id, &entry, &class_name, dataset, &params)
    }

    /// Predict with a trained model.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound`, `Error::NotTrained`, or `Error::Validation`
    /// for rows of the wrong width.
    pub fn predict(&self, model_id: &str, features: &[Vec<f64>]) -> Result<Predictions> {
        let (id, entry) = self.entry(model_id)?;
        let state = entry.state.read();
        if !state.backend.is_trained() {
            return Err(Error::NotTrained(id.to_string()));
        }
        let predictions = state.backend.predict(features)?;
        debug!(model_id = %id, rows = features.len(), "predictions served");
        Ok(predictions)
    }

    /// Remove the model from memory, then delete its snapshot best-effort.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown model.
    pub fn delete(&self, model_id: &str) -> Result<()> {
        let (id, entry) = self
            .models
            .remove(model_id)
            .ok_or_else(|| Error::NotFound(format!("model {model_id}")))?;

        // Wait for an in-flight mutation so its snapshot write cannot land
        // after the delete below.
        let _op = entry.op_lock.lock();
        entry.deleted.store(true, Ordering::Release);
        if let Err(e) = self.store.delete(&id) {
            warn!(model_id = %id, error = %e, "failed to delete model snapshot");
        }
        info!(model_id = %id, "model deleted");
        Ok(())
    }

    /// Summaries of all models in creation order.
    #[must_use]
    pub fn list(&self) -> Vec<ModelSummary> {
        let mut entries: Vec<(ModelId, Arc<ModelEntry>)> = self
            .models
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        debug!(count = entries.len(), "listed models");
        entries
            .iter()
            .map(|(id, entry)| entry.state.read().summary(id))
            .collect()
    }

    /// Summary of one model.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown model.
    pub fn describe(&self, model_id: &str) -> Result<ModelSummary> {
        let (id, entry) = self.entry(model_id)?;
        let summary = entry.state.read().summary(&id);
        Ok(summary)
    }

    /// Rebuild a model from its persisted snapshot, replacing any in-memory
    /// instance with the same id.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownClass` for an unregistered class,
    /// `Error::NotFound` if no snapshot exists, `Error::Validation` if the
    /// snapshot was written by a different backend, or `Error::Persistence`
    /// if it is unreadable.
    pub fn load(&self, model_id: &str, class_name: &str) -> Result<ModelSummary> {
        if !self.registry.contains(class_name) {
            return Err(Error::UnknownClass(class_name.to_string()));
        }
        let id = ModelId::from(model_id);
        let snapshot = self.store.load(&id)?;
        self.restore(snapshot, class_name)
    }

    /// Load every persisted snapshot using the class name it records.
    ///
    /// Unreadable snapshots are logged and skipped. Returns the ids that were
    /// restored, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the store cannot be enumerated.
    pub fn recover(&self) -> Result<Vec<ModelId>> {
        let mut restored = Vec::new();
        for id in self.store.list_ids()? {
            let outcome = self
                .store
                .load(&id)
                .and_then(|snapshot| {
                    let class_name = snapshot.class_name.clone();
                    self.restore(snapshot, &class_name)
                });
            match outcome {
                Ok(_) => restored.push(id),
                Err(e) => warn!(model_id = %id, error = %e, "skipping unrecoverable snapshot"),
            }
        }
        info!(count = restored.len(), "recovered models from snapshots");
        Ok(restored)
    }

    fn new_entry(&self, state: ModelState) -> ModelEntry {
        ModelEntry {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            op_lock: Mutex::new(()),
            state: RwLock::new(state),
            deleted: AtomicBool::new(false),
        }
    }

    fn entry(&self, model_id: &str) -> Result<(ModelId, Arc<ModelEntry>)> {
        self.models
            .get(model_id)
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .ok_or_else(|| Error::NotFound(format!("model {model_id}")))
    }

    fn ensure_live(id: &ModelId, entry: &ModelEntry) -> Result<()> {
        if entry.deleted.load(Ordering::Acquire) {
            return Err(Error::NotFound(format!("model {id}")));
        }
        Ok(())
    }

    fn restore(&self, snapshot: Snapshot, class_name: &str) -> Result<ModelSummary> {
        let mut backend = self.registry.create(class_name, &snapshot.hyperparameters)?;
        if backend.class_name() != snapshot.backend {
            return Err(Error::validation(format!(
                "snapshot {} was written by '{}', not '{class_name}' ({})",
                snapshot.model_id,
                snapshot.backend,
                backend.class_name()
            )));
        }
        if snapshot.trained {
            backend.deserialize(&snapshot.backend_state)?;
        }
        let state = ModelState {
            class_name: class_name.to_string(),
            backend,
            metrics: None,
            trained_at: snapshot.trained.then_some(snapshot.saved_at),
        };
        let id = snapshot.model_id;

        let existing = match self.models.entry(id.clone()) {
            MapEntry::Occupied(occupied) => Arc::clone(occupied.get()),
            MapEntry::Vacant(vacant) => {
                let summary = state.summary(&id);
                vacant.insert(Arc::new(self.new_entry(state)));
                info!(model_id = %id, class_name, "model loaded from snapshot");
                return Ok(summary);
            }
        };

        let _op = existing.op_lock.lock();
        if existing.deleted.load(Ordering::Acquire) {
            // Deleted while we waited; register the snapshot as a new entry.
            let summary = state.summary(&id);
            self.models.insert(id.clone(), Arc::new(self.new_entry(state)));
            return Ok(summary);
        }
        let summary = state.summary(&id);
        *existing.state.write() = state;
        info!(model_id = %id, class_name, "model reloaded from snapshot");
        Ok(summary)
    }

    /// Fit a fresh backend, swap it in, then run side effects under the
    /// caller's operation lock.
    fn fit_and_commit(
        &self,
        id: &ModelId,
        entry: &ModelEntry,
        class_name: &str,
        dataset: &str,
        params: &Hyperparameters,
    ) -> Result<TrainingReport> {
        let data = self.datasets.resolve(dataset)?;
        let (features, labels) = data.split_target()?;

        let mut backend = self.registry.create(class_name, params)?;
        let metrics = backend.train(&features, &labels).map_err(|e| {
            warn!(model_id = %id, dataset, error = %e, "training failed");
            e
        })?;
        let hyperparameters = backend.get_hyperparameters();
        let backend_name = backend.class_name();
        let blob = backend.serialize();
        let trained_at = Utc::now();

        {
            let mut state = entry.state.write();
            state.backend = backend;
            state.metrics = Some(metrics.clone());
            state.trained_at = Some(trained_at);
        }
        info!(model_id = %id, class_name, %metrics, "model trained");

        let side_effects = match blob {
            Ok(blob) => SideEffects {
                persistence: self.persist(id, class_name, backend_name, &hyperparameters, &blob, trained_at),
                artifact: self.publish_artifact(
                    id,
                    ArtifactMetadata {
                        class_name: class_name.to_string(),
                        backend: backend_name.to_string(),
                        hyperparameters: hyperparameters.clone(),
                        metrics: metrics.clone(),
                        trained_at,
                    },
                    &blob,
                ),
                experiment: self.record_experiment(id, &hyperparameters, &metrics),
            },
            Err(e) => {
                warn!(model_id = %id, error = %e, "could not serialize trained model");
                let failed = Outcome::Failed {
                    error: e.to_string(),
                };
                SideEffects {
                    persistence: failed.clone(),
                    artifact: failed,
                    experiment: self.record_experiment(id, &hyperparameters, &metrics),
                }
            }
        };

        Ok(TrainingReport {
            model_id: id.clone(),
            metrics,
            hyperparameters,
            side_effects,
        })
    }

    fn persist(
        &self,
        id: &ModelId,
        class_name: &str,
        backend_name: &str,
        hyperparameters: &Hyperparameters,
        blob: &[u8],
        saved_at: DateTime<Utc>,
    ) -> Outcome {
        let snapshot = Snapshot {
            model_id: id.clone(),
            class_name: class_name.to_string(),
            backend: backend_name.to_string(),
            hyperparameters: hyperparameters.clone(),
            trained: true,
            backend_state: blob.to_vec(),
            saved_at,
        };
        match self.store.save(&snapshot) {
            Ok(()) => {
                debug!(model_id = %id, "snapshot saved");
                Outcome::Succeeded {
                    reference: id.to_string(),
                }
            }
            Err(e) => {
                warn!(model_id = %id, error = %e, "failed to persist model; keeping in-memory state");
                Outcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn publish_artifact(&self, id: &ModelId, metadata: ArtifactMetadata, blob: &[u8]) -> Outcome {
        let Some(sink) = &self.artifact_sink else {
            return Outcome::Skipped;
        };
        Self::collaborator_outcome(id, "artifact sink", sink.publish(id, blob, &metadata))
    }

    fn record_experiment(
        &self,
        id: &ModelId,
        hyperparameters: &Hyperparameters,
        metrics: &TrainingMetrics,
    ) -> Outcome {
        let Some(logger) = &self.experiment_logger else {
            return Outcome::Skipped;
        };
        Self::collaborator_outcome(id, "experiment logger", logger.record(id, hyperparameters, metrics))
    }

    fn collaborator_outcome(id: &ModelId, collaborator: &str, result: anyhow::Result<String>) -> Outcome {
        match result {
            Ok(reference) => {
                debug!(model_id = %id, collaborator, reference = %reference, "published");
                Outcome::Succeeded { reference }
            }
            Err(e) => {
                let error = Error::CollaboratorUnavailable(format!("{collaborator}: {e:#}"));
                warn!(model_id = %id, error = %error, "best-effort publish failed");
                Outcome::Failed {
                    error: error.to_string(),
                }
            }
        }
    }
}

/// Builder for [`ModelLifecycleService`].
///
/// Defaults: built-in registry, in-memory snapshot store, empty in-memory
/// dataset provider, no collaborators.
#[derive(Default)]
pub struct ModelLifecycleServiceBuilder {
    registry: Option<ModelRegistry>,
    store: Option<Arc<dyn PersistenceStore>>,
    datasets: Option<Arc<dyn DatasetProvider>>,
    artifact_sink: Option<Arc<dyn ArtifactSink>>,
    experiment_logger: Option<Arc<dyn ExperimentLogger>>,
}

impl ModelLifecycleServiceBuilder {
    /// Use a custom registry.
    #[must_use]
    pub fn registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use a snapshot store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a dataset provider.
    #[must_use]
    pub fn datasets(mut self, datasets: Arc<dyn DatasetProvider>) -> Self {
        self.datasets = Some(datasets);
        self
    }

    /// Publish trained blobs to `sink`.
    #[must_use]
    pub fn artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifact_sink = Some(sink);
        self
    }

    /// Record training runs with `logger`.
    #[must_use]
    pub fn experiment_logger(mut self, logger: Arc<dyn ExperimentLogger>) -> Self {
        self.experiment_logger = Some(logger);
        self
    }

    /// Build the service.
    #[must_use]
    pub fn build(self) -> ModelLifecycleService {
        ModelLifecycleService {
            registry: self.registry.unwrap_or_default(),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemorySnapshotStore::new())),
            datasets: self
                .datasets
                .unwrap_or_else(|| Arc::new(InMemoryDatasetProvider::new())),
            artifact_sink: self.artifact_sink,
            experiment_logger: self.experiment_logger,
            models: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }
}
