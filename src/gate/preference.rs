//! Preference port used by the confirmation gate
//!
//! The gate only ever reads the dismissal flag. Writing it is the job of
//! whatever control sits next to the prompt (a checkbox, a CLI flag).

use std::collections::HashMap;
use std::path::PathBuf;

/// Key under which the "don't show again" flag is stored
pub const DISMISS_KEY: &str = "credit-confirm-dismissed";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize storage: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Durable string key-value store (the client's "local storage")
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory store, used for tests and sessions without a data directory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Interpret a stored value the way a browser script would treat it
fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value.eq_ignore_ascii_case("false")
        || value == "0"
        || value.eq_ignore_ascii_case("null"))
}

/// Whether the user opted out of confirmation prompts.
///
/// Never fails: any storage error counts as "not dismissed" so the prompt
/// is shown rather than silently skipped.
pub fn is_dismissed<S: PreferenceStore + ?Sized>(store: &S) -> bool {
    match store.get(DISMISS_KEY) {
        Ok(Some(value)) => is_truthy(&value),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!("Could not read dismissal preference, showing prompt: {}", e);
            false
        }
    }
}

/// Write the dismissal flag. `false` removes the key entirely.
pub fn set_dismissed<S: PreferenceStore + ?Sized>(
    store: &mut S,
    dismissed: bool,
) -> Result<(), StorageError> {
    if dismissed {
        store.set(DISMISS_KEY, "true")?;
    } else {
        store.remove(DISMISS_KEY)?;
    }
    tracing::info!("Credit confirmation dismissal set to {}", dismissed);
    Ok(())
}
