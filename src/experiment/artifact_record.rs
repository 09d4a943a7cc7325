//! Artifact Record - content-addressed model snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ModelId;

/// Artifact Record represents a published model blob.
///
/// Artifacts are content-addressed: `cas_hash` has the form
/// `trueno:<16 hex digits>` computed with `trueno::hash_bytes`, so
/// identical blobs share one stored copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    model_id: ModelId,
    key: String,
    cas_hash: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new artifact record for `bytes`.
    ///
    /// # Arguments
    ///
    /// * `model_id` - Model the artifact belongs to
    /// * `key` - Artifact name (e.g., "tree_ensemble.bin")
    /// * `bytes` - Artifact content, hashed for the CAS address
    #[must_use]
    pub fn new(model_id: ModelId, key: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            model_id,
            key: key.into(),
            cas_hash: Self::address(bytes),
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
        }
    }

    /// Content address of `bytes`.
    #[must_use]
    pub fn address(bytes: &[u8]) -> String {
        format!("trueno:{:016x}", trueno::hash_bytes(bytes))
    }

    /// Get the model ID.
    #[must_use]
    pub const fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    /// Get the artifact key/name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the content-addressable hash.
    #[must_use]
    pub fn cas_hash(&self) -> &str {
        &self.cas_hash
    }

    /// Get the artifact size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_record_new() {
        let artifact = ArtifactRecord::new(ModelId::from("m1"), "linear.bin", b"weights");
        assert_eq!(artifact.model_id().as_str(), "m1");
        assert_eq!(artifact.key(), "linear.bin");
        assert_eq!(artifact.size_bytes(), 7);
        assert!(artifact.cas_hash().starts_with("trueno:"));
    }

    #[test]
    fn test_artifact_address_is_content_derived() {
        assert_eq!(ArtifactRecord::address(b"same"), ArtifactRecord::address(b"same"));
        assert_ne!(ArtifactRecord::address(b"same"), ArtifactRecord::address(b"other"));
    }
}
