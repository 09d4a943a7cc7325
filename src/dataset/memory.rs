//! In-memory dataset provider using `DashMap`.
//!
//! Tables are lost on process restart. Useful for tests and for callers that
//! already hold their data in memory.

use super::{DatasetProvider, TabularData};
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// Named tables held in a concurrent hashmap.
///
/// # Example
///
/// ```rust
/// use trueno_mlops::dataset::{DatasetProvider, InMemoryDatasetProvider, TabularData};
///
/// let provider = InMemoryDatasetProvider::new();
/// provider.insert("iris", TabularData::from_rows(vec![vec![5.1, 3.5, 0.0]])?);
/// assert_eq!(provider.resolve("iris")?.num_rows(), 1);
/// # Ok::<(), trueno_mlops::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDatasetProvider {
    tables: DashMap<String, Arc<TabularData>>,
}

impl InMemoryDatasetProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table under `name`.
    pub fn insert(&self, name: impl Into<String>, table: TabularData) {
        self.tables.insert(name.into(), Arc::new(table));
    }

    /// Remove a table. No-op if absent.
    pub fn remove(&self, name: &str) {
        self.tables.remove(name);
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl DatasetProvider for InMemoryDatasetProvider {
    fn resolve(&self, name: &str) -> Result<Arc<TabularData>> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| Error::NotFound(format!("dataset {name}")))
    }
}
