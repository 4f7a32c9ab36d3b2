//! File-backed durable store: one file per key under the app config dir.

use shared::storage::DurableStore;
use std::fs;
use std::path::PathBuf;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        let dir = directories::ProjectDirs::from("com.local", "Trio Chat", "TrioChat")
            .map(|p| p.config_dir().join("storage"))
            .unwrap_or_else(|| PathBuf::from("./storage"));
        Self { dir }
    }

    /// Store rooted at an explicit directory (tests, portable installs).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, not user input.
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), "failed to create storage dir: {err}");
            return;
        }
        if let Err(err) = fs::write(self.path_for(key), value) {
            tracing::warn!(key, "failed to persist value: {err}");
        }
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}
