//! Key-value persistence ports.
//!
//! Two independent surfaces back the app: a session-scoped store holding the
//! credential record for the lifetime of one session, and a durable store
//! holding the theme flag and per-surface conversation logs. Both speak the
//! same small get/set/remove contract so any key-value backend fits.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Well-known keys used across both stores.
pub mod keys {
    /// Serialized credential record (session store).
    pub const CREDENTIALS: &str = "appConfig";
    /// Theme flag, `"dark"` or `"light"` (durable store).
    pub const THEME: &str = "theme";
}

/// Session-scoped storage; contents are expected to vanish with the session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Durable storage; contents survive restarts.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store. The default session-scoped backend, and a convenient
/// durable stand-in for tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
