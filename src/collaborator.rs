//! External collaborators reached after a successful fit
//!
//! Both collaborators are best-effort: the lifecycle service never fails a
//! training call because one of them did. Their failures are opaque to the
//! core, so the traits return `anyhow::Result`.

use crate::backend::TrainingMetrics;
use crate::{Hyperparameters, ModelId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes a published model blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Class name the model was created with
    pub class_name: String,
    /// Canonical backend name
    pub backend: String,
    /// Hyperparameters of the fit
    pub hyperparameters: Hyperparameters,
    /// Training metrics of the fit
    pub metrics: TrainingMetrics,
    /// When the fit completed
    pub trained_at: DateTime<Utc>,
}

/// Publishes trained model blobs to external storage.
pub trait ArtifactSink: Send + Sync + fmt::Debug {
    /// Publish `bytes` for `model_id`; returns an external reference.
    ///
    /// # Errors
    ///
    /// Any failure of the external store.
    fn publish(&self, model_id: &ModelId, bytes: &[u8], metadata: &ArtifactMetadata) -> anyhow::Result<String>;
}

/// Records training runs with an experiment tracker.
pub trait ExperimentLogger: Send + Sync + fmt::Debug {
    /// Record one completed fit; returns an external run reference.
    ///
    /// # Errors
    ///
    /// Any failure of the external tracker.
    fn record(
        &self,
        model_id: &ModelId,
        hyperparameters: &Hyperparameters,
        metrics: &TrainingMetrics,
    ) -> anyhow::Result<String>;
}

/// Result of one best-effort side effect of a training call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Side effect completed; `reference` locates the result
    Succeeded {
        /// Snapshot id, artifact reference or run reference
        reference: String,
    },
    /// No collaborator configured
    Skipped,
    /// Side effect failed; the training result stands
    Failed {
        /// Rendered error
        error: String,
    },
}

impl Outcome {
    /// Whether the side effect completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Whether the side effect failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Side-effect outcomes of one `train` / `retrain` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffects {
    /// Snapshot write
    pub persistence: Outcome,
    /// Artifact publication
    pub artifact: Outcome,
    /// Experiment record
    pub experiment: Outcome,
}
