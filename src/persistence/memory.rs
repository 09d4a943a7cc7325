//! In-memory snapshot store using `DashMap`.
//!
//! Data is lost on process restart; used for tests and ephemeral services.

use super::{PersistenceStore, Snapshot};
use crate::{Error, ModelId, Result};
use dashmap::DashMap;

/// In-memory snapshot store.
///
/// # Example
///
/// ```rust
/// use trueno_mlops::persistence::{MemorySnapshotStore, PersistenceStore};
/// use trueno_mlops::ModelId;
///
/// let store = MemorySnapshotStore::new();
/// assert!(store.load(&ModelId::from("missing")).is_err());
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<ModelId, Snapshot>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl PersistenceStore for MemorySnapshotStore {
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots
            .insert(snapshot.model_id.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, id: &ModelId) -> Result<Snapshot> {
        self.snapshots
            .get(id)
            .map(|s| s.value().clone())
            .ok_or_else(|| Error::NotFound(format!("snapshot for model {id}")))
    }

    fn delete(&self, id: &ModelId) -> Result<()> {
        self.snapshots.remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<ModelId>> {
        let mut ids: Vec<ModelId> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hyperparameters;
    use chrono::Utc;

    fn snapshot(id: &str) -> Snapshot {
        Snapshot {
            model_id: ModelId::from(id),
            class_name: "linear".to_string(),
            backend: "linear".to_string(),
            hyperparameters: Hyperparameters::new().with("C", 1.0),
            trained: false,
            backend_state: vec![1, 2, 3],
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_load_delete() {
        let store = MemorySnapshotStore::new();
        let snap = snapshot("x");
        store.save(&snap).unwrap();
        assert_eq!(store.load(&snap.model_id).unwrap(), snap);
        assert_eq!(store.len(), 1);

        store.delete(&snap.model_id).unwrap();
        store.delete(&snap.model_id).unwrap();
        assert!(matches!(store.load(&snap.model_id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_ids_sorted() {
        let store = MemorySnapshotStore::new();
        for id in ["c", "a", "b"] {
            store.save(&snapshot(id)).unwrap();
        }
        let ids: Vec<String> = store.list_ids().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
