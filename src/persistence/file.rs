//! File-backed snapshot store: one JSON envelope per model id.

use super::{Compression, PersistenceStore, Snapshot};
use crate::{Error, Hyperparameters, ModelId, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;
const EXTENSION: &str = "snapshot";

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    format_version: u32,
    model_id: ModelId,
    class_name: String,
    backend: String,
    hyperparameters: Hyperparameters,
    trained: bool,
    /// Hex of the (possibly compressed) backend blob
    backend_state: String,
    /// `trueno:<hash>` of the uncompressed backend blob
    checksum: String,
    compression: Compression,
    saved_at: DateTime<Utc>,
}

fn checksum(bytes: &[u8]) -> String {
    format!("trueno:{:016x}", trueno::hash_bytes(bytes))
}

/// Snapshot store rooted at a directory.
///
/// Writes go to `<id>.snapshot.tmp` and are renamed into place, so readers
/// never observe a partial snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    compression: Compression,
}

impl FileSnapshotStore {
    /// Open or create a store at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            compression: Compression::None,
        })
    }

    /// Compress backend blobs written from now on.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot path for `id`, or `None` if the id cannot name a file.
    #[must_use]
    pub fn path_for(&self, id: &ModelId) -> Option<PathBuf> {
        id.is_path_safe()
            .then(|| self.dir.join(format!("{id}.{EXTENSION}")))
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        let stored = self.compression.compress(&snapshot.backend_state)?;
        let file = SnapshotFile {
            format_version: FORMAT_VERSION,
            model_id: snapshot.model_id.clone(),
            class_name: snapshot.class_name.clone(),
            backend: snapshot.backend.clone(),
            hyperparameters: snapshot.hyperparameters.clone(),
            trained: snapshot.trained,
            backend_state: hex::encode(stored),
            checksum: checksum(&snapshot.backend_state),
            compression: self.compression,
            saved_at: snapshot.saved_at,
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    fn decode(id: &ModelId, bytes: &[u8]) -> Result<Snapshot> {
        let file: SnapshotFile = serde_json::from_slice(bytes)
            .map_err(|e| Error::persistence(format!("snapshot {id} is unreadable: {e}")))?;
        if file.format_version != FORMAT_VERSION {
            return Err(Error::persistence(format!(
                "snapshot {id} has format version {} (supported: {FORMAT_VERSION})",
                file.format_version
            )));
        }
        if &file.model_id != id {
            return Err(Error::persistence(format!(
                "snapshot file for {id} records model id {}",
                file.model_id
            )));
        }
        let stored = hex::decode(&file.backend_state)
            .map_err(|e| Error::persistence(format!("snapshot {id} backend state: {e}")))?;
        let backend_state = file.compression.decompress(&stored)?;
        if checksum(&backend_state) != file.checksum {
            return Err(Error::persistence(format!("snapshot {id} failed checksum verification")));
        }
        Ok(Snapshot {
            model_id: file.model_id,
            class_name: file.class_name,
            backend: file.backend,
            hyperparameters: file.hyperparameters,
            trained: file.trained,
            backend_state,
            saved_at: file.saved_at,
        })
    }
}

impl PersistenceStore for FileSnapshotStore {
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.path_for(&snapshot.model_id).ok_or_else(|| {
            Error::validation(format!("model id '{}' cannot name a snapshot file", snapshot.model_id))
        })?;
        let data = self.encode(snapshot)?;

        // Atomic write: write to temp file, then rename
        let tmp_path = path.with_extension(format!("{EXTENSION}.tmp"));
        let written = std::fs::write(&tmp_path, data).and_then(|()| std::fs::rename(&tmp_path, &path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        tracing::trace!(model_id = %snapshot.model_id, path = %path.display(), "snapshot written");
        Ok(())
    }

    fn load(&self, id: &ModelId) -> Result<Snapshot> {
        let not_found = || Error::NotFound(format!("snapshot for model {id}"));
        let path = self.path_for(id).ok_or_else(not_found)?;
        match std::fs::read(&path) {
            Ok(data) => Self::decode(id, &data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &ModelId) -> Result<()> {
        let Some(path) = self.path_for(id) else {
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_ids(&self) -> Result<Vec<ModelId>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(ModelId::from(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
