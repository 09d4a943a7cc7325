//! Snapshot persistence
//!
//! A [`Snapshot`] captures everything needed to rebuild a model instance:
//! class name, resolved hyperparameters, trained flag and the opaque backend
//! blob. [`PersistenceStore`] implementations keep one snapshot per model id;
//! each save overwrites the previous one.
//!
//! ## On-disk layout
//!
//! [`FileSnapshotStore`] writes `<dir>/<id>.snapshot`, a JSON envelope:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "model_id": "…", "class_name": "random_forest", "backend": "tree_ensemble",
//!   "hyperparameters": {…}, "trained": true,
//!   "backend_state": "<hex>", "checksum": "trueno:<16 hex>",
//!   "compression": "none", "saved_at": "2024-…Z"
//! }
//! ```

mod compression;
mod file;
mod memory;

pub use compression::Compression;
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::{Hyperparameters, ModelId, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// Durable state of one model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Model id
    pub model_id: ModelId,
    /// Class name the instance was created with (may be an alias)
    pub class_name: String,
    /// Canonical backend name that produced `backend_state`
    pub backend: String,
    /// Resolved hyperparameters at the time of the save
    pub hyperparameters: Hyperparameters,
    /// Whether `backend_state` holds a fitted model
    pub trained: bool,
    /// Opaque blob from `ModelBackend::serialize`
    pub backend_state: Vec<u8>,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
}

/// Durable snapshot storage keyed by model id.
pub trait PersistenceStore: Send + Sync + fmt::Debug {
    /// Write `snapshot`, replacing any previous snapshot for the same id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` or `Error::Io` if the write fails.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Read the snapshot for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no snapshot exists, or
    /// `Error::Persistence` if it is unreadable or fails verification.
    fn load(&self, id: &ModelId) -> Result<Snapshot>;

    /// Remove the snapshot for `id`. No-op if absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if removal fails.
    fn delete(&self, id: &ModelId) -> Result<()>;

    /// Ids with a stored snapshot, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the store cannot be enumerated.
    fn list_ids(&self) -> Result<Vec<ModelId>>;
}
