//! File-backed local storage
//!
//! A flat table kept in `storage.toml` under the data directory. Values are
//! handed out as strings; a hand-written `key = true` reads as `"true"`.
//! Every read goes back to disk so a value written by another creditgate
//! process (e.g. `--reset-confirmations` while the TUI runs) is picked up.

use std::path::{Path, PathBuf};

use crate::gate::preference::{PreferenceStore, StorageError};

const STORAGE_FILE: &str = "storage.toml";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data_dir>/creditgate/storage.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("creditgate").join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<toml::Table, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|source| StorageError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Load for a write. A corrupt file is replaced rather than blocking writes.
    fn load_for_write(&self) -> Result<toml::Table, StorageError> {
        match self.load() {
            Err(e @ StorageError::Parse { .. }) => {
                tracing::warn!("Discarding unreadable storage: {}", e);
                Ok(toml::Table::new())
            }
            other => other,
        }
    }

    fn persist(&self, entries: &toml::Table) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(entries)?;
        std::fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key).map(|value| match value {
            toml::Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.load_for_write()?;
        entries.insert(key.to_string(), toml::Value::String(value.to_string()));
        self.persist(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let (mut entries, recovered) = match self.load() {
            Ok(entries) => (entries, false),
            Err(e @ StorageError::Parse { .. }) => {
                tracing::warn!("Discarding unreadable storage: {}", e);
                (toml::Table::new(), true)
            }
            Err(e) => return Err(e),
        };
        if entries.remove(key).is_some() || recovered {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::preference::{is_dismissed, set_dismissed, DISMISS_KEY};

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested").join(STORAGE_FILE));

        assert_eq!(storage.get(DISMISS_KEY).unwrap(), None);
        assert!(!is_dismissed(&storage));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(STORAGE_FILE);

        let mut storage = LocalStorage::new(&path);
        storage.set("other", "kept").unwrap();
        set_dismissed(&mut storage, true).unwrap();

        let reopened = LocalStorage::new(&path);
        assert!(is_dismissed(&reopened));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("kept"));

        let mut reopened = reopened;
        set_dismissed(&mut reopened, false).unwrap();
        assert!(!is_dismissed(&storage));
        assert_eq!(storage.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);
        std::fs::write(&path, "this is = = not toml").unwrap();

        let storage = LocalStorage::new(&path);
        assert!(matches!(storage.get(DISMISS_KEY), Err(StorageError::Parse { .. })));
        assert!(!is_dismissed(&storage));
    }

    #[test]
    fn test_hand_written_boolean_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);
        std::fs::write(&path, "credit-confirm-dismissed = true\nvisits = 3\n").unwrap();

        let mut storage = LocalStorage::new(&path);
        assert_eq!(storage.get(DISMISS_KEY).unwrap().as_deref(), Some("true"));
        assert_eq!(storage.get("visits").unwrap().as_deref(), Some("3"));
        assert!(is_dismissed(&storage));

        std::fs::write(&path, "credit-confirm-dismissed = false\n").unwrap();
        assert!(!is_dismissed(&storage));

        // Writing keeps unrelated non-string values intact
        std::fs::write(&path, "visits = 3\n").unwrap();
        set_dismissed(&mut storage, true).unwrap();
        assert!(is_dismissed(&storage));
        assert_eq!(storage.get("visits").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_writes_recover_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORAGE_FILE);

        std::fs::write(&path, "this is = = not toml").unwrap();
        let mut storage = LocalStorage::new(&path);
        set_dismissed(&mut storage, true).unwrap();
        assert!(is_dismissed(&storage));

        std::fs::write(&path, "this is = = not toml").unwrap();
        set_dismissed(&mut storage, false).unwrap();
        assert_eq!(storage.get(DISMISS_KEY).unwrap(), None);
        assert!(!is_dismissed(&storage));
    }
}
