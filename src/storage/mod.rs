//! Flat-file JSON storage: one file per collection, loaded wholesale and
//! rewritten wholesale on any mutation.

use crate::core::{RegistryError, Result};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stored attributes of one record, keyed by field name.
pub type StoredAttrs = JsonMap<String, JsonValue>;

/// The whole persisted data set: identifier to stored attributes.
pub type Collection = BTreeMap<String, StoredAttrs>;

/// Storage seam for the registry. A failed `save` must never be treated as
/// having persisted.
pub trait Storage: Send + Sync {
    fn load(&self) -> Result<Collection>;
    fn save(&self, collection: &Collection) -> Result<()>;
}

/// JSON file store. A missing file is an empty collection; an unreadable or
/// corrupt file is `StorageUnavailable`.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStore {
    fn load(&self) -> Result<Collection> {
        if !self.path.exists() {
            return Ok(Collection::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|e| {
            RegistryError::StorageUnavailable(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            RegistryError::StorageUnavailable(format!(
                "corrupt JSON in {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, collection: &Collection) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| {
            RegistryError::StorageWriteError(format!(
                "failed to create {}: {}",
                parent.display(),
                e
            ))
        })?;

        // Write to a temp file in the same directory, then rename over the
        // target, so a failed write never leaves a half-written file.
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| RegistryError::StorageWriteError(format!("temp file: {}", e)))?;
        let serialized = serde_json::to_string_pretty(collection)
            .map_err(|e| RegistryError::StorageWriteError(format!("serialize: {}", e)))?;
        tmp.write_all(serialized.as_bytes())
            .map_err(|e| RegistryError::StorageWriteError(format!("write: {}", e)))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| RegistryError::StorageWriteError(format!("sync: {}", e)))?;
        tmp.persist(&self.path).map_err(|e| {
            RegistryError::StorageWriteError(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn attrs(value: JsonValue) -> StoredAttrs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_file_loads_as_empty_collection() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("patients.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("patients.json"));

        let mut collection = Collection::new();
        collection.insert(
            "P001".to_string(),
            attrs(json!({ "name": "Asha", "age": 30 })),
        );
        store.save(&collection).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["P001"]["name"], "Asha");
    }

    #[test]
    fn corrupt_file_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patients.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonStore::new(&path).load().unwrap_err();
        assert!(matches!(err, RegistryError::StorageUnavailable(_)));
    }

    #[test]
    fn save_replaces_previous_contents_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patients.json");
        let store = JsonStore::new(&path);

        let mut collection = Collection::new();
        collection.insert("P001".to_string(), attrs(json!({ "name": "Asha" })));
        store.save(&collection).unwrap();

        collection.remove("P001");
        collection.insert("P002".to_string(), attrs(json!({ "name": "Bela" })));
        store.save(&collection).unwrap();

        let loaded = store.load().unwrap();
        assert!(!loaded.contains_key("P001"));
        assert!(loaded.contains_key("P002"));
        // No stray temp files left behind.
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
