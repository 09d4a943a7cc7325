//! # Trueno-MLOps: Model Lifecycle Management
//!
//! Trueno-MLOps manages machine-learning model instances identified by opaque
//! ids through one capability contract that abstracts over interchangeable
//! backends (random forests and regularized linear/logistic models, fitted by
//! smartcore).
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A failed fit never replaces a working model
//! - **Poka-Yoke safety**: Versioned, checksummed snapshots written atomically
//! - **Heijunka**: Per-model locks; different models never block each other
//! - **Genchi Genbutsu**: Every lifecycle transition is traced with its model id
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_mlops::config::ServiceConfig;
//! use trueno_mlops::{logging, Hyperparameters, ModelLifecycleService};
//!
//! let config = ServiceConfig::load(None)?;
//! logging::init(&config.logging)?;
//!
//! let service = ModelLifecycleService::from_config(&config)?;
//! service.recover()?;
//!
//! let id = service.create("random_forest", &Hyperparameters::new().with("n_estimators", 50_i64))?;
//! let report = service.train(&id, "iris.parquet")?;
//! println!("accuracy = {:?}", report.metrics.get("accuracy"));
//! # Ok::<(), trueno_mlops::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod collaborator;
pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod hyperparams;
pub mod logging;
pub mod model_id;
pub mod persistence;
pub mod registry;
pub mod service;

pub use backend::{ModelBackend, Predictions, TaskType, TrainingMetrics};
pub use error::{Error, Result};
pub use hyperparams::{HyperValue, Hyperparameters};
pub use model_id::ModelId;
pub use registry::ModelRegistry;
#[cfg(feature = "tokio")]
pub use service::AsyncLifecycle;
pub use service::{ModelLifecycleService, ModelSummary, TrainingReport};
