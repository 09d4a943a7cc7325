//! Run Record - one completed training call of a model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Hyperparameters, ModelId};

/// Run Record represents a single train or retrain of a model.
///
/// Runs of the same model are numbered from 1 in the order they were
/// recorded; the run number doubles as the step of its metric records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    run_id: String,
    model_id: ModelId,
    run_number: u64,
    hyperparameters: Hyperparameters,
    recorded_at: DateTime<Utc>,
}

impl RunRecord {
    /// Create a new run record.
    ///
    /// # Arguments
    ///
    /// * `model_id` - Model the run trained
    /// * `run_number` - 1-based position among the model's runs
    /// * `hyperparameters` - Resolved hyperparameters used for the fit
    ///
    /// The run id is `<model_id>-run-<run_number>`.
    #[must_use]
    pub fn new(model_id: ModelId, run_number: u64, hyperparameters: Hyperparameters) -> Self {
        Self {
            run_id: format!("{model_id}-run-{run_number}"),
            model_id,
            run_number,
            hyperparameters,
            recorded_at: Utc::now(),
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the model ID.
    #[must_use]
    pub const fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    /// Get the 1-based run number.
    #[must_use]
    pub const fn run_number(&self) -> u64 {
        self.run_number
    }

    /// Get the hyperparameters of the fit.
    #[must_use]
    pub const fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Get the timestamp when the run was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_new() {
        let params = Hyperparameters::new().with("C", 2.0);
        let run = RunRecord::new(ModelId::from("m1"), 3, params.clone());
        assert_eq!(run.run_id(), "m1-run-3");
        assert_eq!(run.model_id().as_str(), "m1");
        assert_eq!(run.run_number(), 3);
        assert_eq!(run.hyperparameters(), &params);
    }

    #[test]
    fn test_run_record_serialization() {
        let run = RunRecord::new(ModelId::from("m1"), 1, Hyperparameters::new());
        let json = serde_json::to_string(&run).unwrap();
        let back: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }
}
