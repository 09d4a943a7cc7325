//! Experiment Store - in-memory storage for experiment tracking data
//!
//! This module provides the storage layer for experiment tracking,
//! optimized for per-model metric history queries.

use rustc_hash::FxHashMap;

use super::{ArtifactRecord, MetricRecord, RunRecord};
use crate::ModelId;

/// In-memory store for experiment tracking data.
///
/// ## Design
///
/// Runs are kept per model in recording order. Metrics live in one vector
/// that is filtered and sorted by step for history queries. Artifact blobs
/// are stored once per content hash.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    runs: FxHashMap<ModelId, Vec<RunRecord>>,
    metrics: Vec<MetricRecord>,
    artifacts: Vec<ArtifactRecord>,
    blobs: FxHashMap<String, Vec<u8>>,
}

impl ExperimentStore {
    /// Create a new empty experiment store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the store is empty (no runs, metrics, or artifacts).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.metrics.is_empty() && self.artifacts.is_empty()
    }

    /// Get the number of runs across all models.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    /// Get the number of metrics in the store.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Get the number of distinct artifact blobs.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    /// Run number the next run of `model_id` will get.
    #[must_use]
    pub fn next_run_number(&self, model_id: &ModelId) -> u64 {
        self.runs.get(model_id).map_or(1, |runs| runs.len() as u64 + 1)
    }

    /// Add a run to the store.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.entry(run.model_id().clone()).or_default().push(run);
    }

    /// Get a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.values().flatten().find(|run| run.run_id() == run_id)
    }

    /// Get all runs of a model in recording order.
    #[must_use]
    pub fn get_runs_for_model(&self, model_id: &ModelId) -> &[RunRecord] {
        self.runs.get(model_id).map_or(&[][..], Vec::as_slice)
    }

    /// Add a metric to the store.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Get the history of one metric across a model's runs, ordered by step.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use trueno_mlops::experiment::{ExperimentStore, MetricRecord, RunRecord};
    /// use trueno_mlops::{Hyperparameters, ModelId};
    ///
    /// let mut store = ExperimentStore::new();
    /// let model = ModelId::from("m1");
    /// for step in 1..=3 {
    ///     let run = RunRecord::new(model.clone(), step, Hyperparameters::new());
    ///     store.add_metric(MetricRecord::new(run.run_id(), "accuracy", step, 0.8));
    ///     store.add_run(run);
    /// }
    ///
    /// let history = store.get_metric_history(&model, "accuracy");
    /// assert_eq!(history.len(), 3);
    /// ```
    #[must_use]
    pub fn get_metric_history(&self, model_id: &ModelId, key: &str) -> Vec<MetricRecord> {
        let runs = self.get_runs_for_model(model_id);
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.key() == key && runs.iter().any(|r| r.run_id() == m.run_id()))
            .cloned()
            .collect();

        // Sort by step for time-series ordering
        metrics.sort_by_key(MetricRecord::step);

        metrics
    }

    /// Add an artifact record and its content.
    pub fn add_artifact(&mut self, artifact: ArtifactRecord, bytes: &[u8]) {
        self.blobs
            .entry(artifact.cas_hash().to_string())
            .or_insert_with(|| bytes.to_vec());
        self.artifacts.push(artifact);
    }

    /// Get all artifact records of a model.
    #[must_use]
    pub fn get_artifacts_for_model(&self, model_id: &ModelId) -> Vec<&ArtifactRecord> {
        self.artifacts
            .iter()
            .filter(|a| a.model_id() == model_id)
            .collect()
    }

    /// Get artifact content by content hash.
    #[must_use]
    pub fn get_blob(&self, cas_hash: &str) -> Option<&[u8]> {
        self.blobs.get(cas_hash).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hyperparameters;

    #[test]
    fn test_store_default() {
        let store = ExperimentStore::new();
        assert!(store.is_empty());
        assert_eq!(store.run_count(), 0);
        assert_eq!(store.metric_count(), 0);
        assert_eq!(store.next_run_number(&ModelId::from("m")), 1);
    }

    #[test]
    fn test_store_add_and_get() {
        let mut store = ExperimentStore::new();
        let model = ModelId::from("m1");

        let run = RunRecord::new(model.clone(), 1, Hyperparameters::new());
        store.add_metric(MetricRecord::new(run.run_id(), "mse", 1, 0.5));
        store.add_run(run);

        assert!(!store.is_empty());
        assert!(store.get_run("m1-run-1").is_some());
        assert_eq!(store.next_run_number(&model), 2);
    }

    #[test]
    fn test_metric_history_ordering_and_isolation() {
        let mut store = ExperimentStore::new();
        let a = ModelId::from("a");
        let b = ModelId::from("b");

        // Add out of order
        for step in [2, 1, 3] {
            let run = RunRecord::new(a.clone(), step, Hyperparameters::new());
            #[allow(clippy::cast_precision_loss)]
            store.add_metric(MetricRecord::new(run.run_id(), "accuracy", step, step as f64 / 10.0));
            store.add_run(run);
        }
        let other = RunRecord::new(b, 1, Hyperparameters::new());
        store.add_metric(MetricRecord::new(other.run_id(), "accuracy", 1, 1.0));
        store.add_run(other);

        let history = store.get_metric_history(&a, "accuracy");
        assert_eq!(history.iter().map(MetricRecord::step).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_artifact_blobs_are_deduplicated() {
        let mut store = ExperimentStore::new();
        let model = ModelId::from("m");
        store.add_artifact(ArtifactRecord::new(model.clone(), "x.bin", b"blob"), b"blob");
        store.add_artifact(ArtifactRecord::new(model.clone(), "x.bin", b"blob"), b"blob");

        assert_eq!(store.get_artifacts_for_model(&model).len(), 2);
        assert_eq!(store.blob_count(), 1);
        let hash = ArtifactRecord::address(b"blob");
        assert_eq!(store.get_blob(&hash), Some(&b"blob"[..]));
    }
}
