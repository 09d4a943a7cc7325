//! Experiment Tracking
//!
//! Local implementation of the [`ExperimentLogger`](crate::collaborator::ExperimentLogger)
//! and [`ArtifactSink`](crate::collaborator::ArtifactSink) collaborators.
//!
//! ## Schema Overview
//!
//! ```text
//! ModelId (1) ──< RunRecord (N) ──< MetricRecord (N) [series by run number]
//!        │
//!        └──< ArtifactRecord (N) [CAS]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_mlops::experiment::LocalExperimentTracker;
//! use trueno_mlops::ModelLifecycleService;
//!
//! let tracker = Arc::new(LocalExperimentTracker::new());
//! let service = ModelLifecycleService::builder()
//!     .experiment_logger(tracker.clone())
//!     .artifact_sink(tracker)
//!     .build();
//! # let _ = service;
//! ```

mod artifact_record;
mod metric_record;
mod run_record;
mod store;
mod tracker;

pub use artifact_record::ArtifactRecord;
pub use metric_record::MetricRecord;
pub use run_record::RunRecord;
pub use store::ExperimentStore;
pub use tracker::LocalExperimentTracker;
