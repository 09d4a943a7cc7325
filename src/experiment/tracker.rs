//! In-process experiment tracker backing both collaborator traits.

use parking_lot::Mutex;

use super::{ArtifactRecord, ExperimentStore, MetricRecord, RunRecord};
use crate::backend::TrainingMetrics;
use crate::collaborator::{ArtifactMetadata, ArtifactSink, ExperimentLogger};
use crate::{Hyperparameters, ModelId};

/// Local experiment tracker.
///
/// `record` appends a [`RunRecord`] plus one [`MetricRecord`] per metric and
/// returns the run id. `publish` stores the blob content-addressed and
/// returns its CAS hash.
///
/// # Example
///
/// ```rust
/// use trueno_mlops::collaborator::ExperimentLogger;
/// use trueno_mlops::experiment::LocalExperimentTracker;
/// use trueno_mlops::backend::TrainingMetrics;
/// use trueno_mlops::{Hyperparameters, ModelId};
///
/// let tracker = LocalExperimentTracker::new();
/// let mut metrics = TrainingMetrics::new();
/// metrics.insert("accuracy", 0.9);
///
/// let run = tracker.record(&ModelId::from("m1"), &Hyperparameters::new(), &metrics).unwrap();
/// assert_eq!(run, "m1-run-1");
/// assert_eq!(tracker.metric_history(&ModelId::from("m1"), "accuracy").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LocalExperimentTracker {
    store: Mutex<ExperimentStore>,
}

impl LocalExperimentTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs recorded for `model_id`, oldest first.
    #[must_use]
    pub fn runs(&self, model_id: &ModelId) -> Vec<RunRecord> {
        self.store.lock().get_runs_for_model(model_id).to_vec()
    }

    /// History of metric `key` for `model_id`, ordered by run number.
    #[must_use]
    pub fn metric_history(&self, model_id: &ModelId, key: &str) -> Vec<MetricRecord> {
        self.store.lock().get_metric_history(model_id, key)
    }

    /// Artifacts published for `model_id`.
    #[must_use]
    pub fn artifacts(&self, model_id: &ModelId) -> Vec<ArtifactRecord> {
        self.store
            .lock()
            .get_artifacts_for_model(model_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Content of a published artifact.
    #[must_use]
    pub fn artifact_bytes(&self, cas_hash: &str) -> Option<Vec<u8>> {
        self.store.lock().get_blob(cas_hash).map(<[u8]>::to_vec)
    }
}

impl ExperimentLogger for LocalExperimentTracker {
    fn record(
        &self,
        model_id: &ModelId,
        hyperparameters: &Hyperparameters,
        metrics: &TrainingMetrics,
    ) -> anyhow::Result<String> {
        let mut store = self.store.lock();
        let run_number = store.next_run_number(model_id);
        let run = RunRecord::new(model_id.clone(), run_number, hyperparameters.clone());
        let run_id = run.run_id().to_string();
        for (key, value) in metrics.iter() {
            store.add_metric(MetricRecord::new(run_id.as_str(), key, run_number, value));
        }
        store.add_run(run);
        Ok(run_id)
    }
}

impl ArtifactSink for LocalExperimentTracker {
    fn publish(&self, model_id: &ModelId, bytes: &[u8], metadata: &ArtifactMetadata) -> anyhow::Result<String> {
        let artifact = ArtifactRecord::new(model_id.clone(), format!("{}.bin", metadata.backend), bytes);
        let reference = artifact.cas_hash().to_string();
        self.store.lock().add_artifact(artifact, bytes);
        Ok(reference)
    }
}
