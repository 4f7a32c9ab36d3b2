//! Per-session credential record and the store that owns it.
//!
//! One record (`{userName, apiKey}`) gates every outbound request. The store
//! persists it to the session-scoped storage port, rehydrates on startup,
//! and publishes changes through an explicit subscribe/unsubscribe contract:
//! a subscriber receives the current value immediately and every change
//! afterwards, until it unsubscribes.

use crate::storage::{keys, SessionStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroize;

/// Recognized provider key prefix.
const KEY_PREFIX: &str = "sk-";

/// The user-supplied identity/key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub user_name: String,
    pub api_key: String,
}

impl CredentialRecord {
    /// Builds a record from raw form input, trimming both fields.
    pub fn new(user_name: &str, api_key: &str) -> Result<Self, CredentialError> {
        let user_name = user_name.trim();
        let api_key = api_key.trim();
        if user_name.is_empty() {
            return Err(CredentialError::EmptyName);
        }
        if api_key.is_empty() {
            return Err(CredentialError::EmptyKey);
        }
        if !api_key.starts_with(KEY_PREFIX) {
            return Err(CredentialError::InvalidKeyFormat);
        }
        Ok(Self {
            user_name: user_name.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Validation failures surfaced inline by the configuration form. None of
/// these ever reach storage or the conversation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Please enter your name")]
    EmptyName,
    #[error("Please enter your API key")]
    EmptyKey,
    #[error("Invalid API key format. It should start with \"sk-\"")]
    InvalidKeyFormat,
}

/// Handle returned by [`CredentialStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(Option<&CredentialRecord>) + Send + Sync>;

/// Owns the single credential record for the session.
pub struct CredentialStore {
    session: Arc<dyn SessionStore>,
    current: Mutex<Option<CredentialRecord>>,
    subscribers: Mutex<Vec<(u64, Subscriber)>>,
    next_id: Mutex<u64>,
}

impl CredentialStore {
    /// Creates the store, rehydrating a previously persisted record if the
    /// session store holds a parsable one.
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        let current = match session.get(keys::CREDENTIALS) {
            Some(raw) => match serde_json::from_str::<CredentialRecord>(&raw) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!("discarding unparsable persisted credentials: {err}");
                    None
                }
            },
            None => None,
        };
        Self {
            session,
            current: Mutex::new(current),
            subscribers: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Validates and commits a new record: persisted first, then held in
    /// memory, then published to subscribers. Invalid input never reaches
    /// storage.
    pub fn set(&self, record: CredentialRecord) -> Result<(), CredentialError> {
        // Re-validate: records can be constructed literally in tests/config.
        let record = CredentialRecord::new(&record.user_name, &record.api_key)?;
        match serde_json::to_string(&record) {
            Ok(raw) => self.session.set(keys::CREDENTIALS, &raw),
            Err(err) => tracing::warn!("failed to serialize credentials: {err}"),
        }
        *self.current.lock() = Some(record.clone());
        tracing::info!(user = %record.user_name, "credentials configured");
        self.notify(Some(&record));
        Ok(())
    }

    pub fn get(&self) -> Option<CredentialRecord> {
        self.current.lock().clone()
    }

    /// Removes the record from memory and storage and publishes the absence.
    /// The in-memory key material is wiped.
    pub fn clear(&self) {
        if let Some(mut old) = self.current.lock().take() {
            old.api_key.zeroize();
        }
        self.session.remove(keys::CREDENTIALS);
        tracing::info!("credentials cleared");
        self.notify(None);
    }

    pub fn is_configured(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|r| !r.api_key.is_empty())
            .unwrap_or(false)
    }

    /// Registers a subscriber. The callback runs immediately with the
    /// current value and again on every change until unsubscribed.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&CredentialRecord>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let current = self.get();
        callback(current.as_ref());
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        self.subscribers.lock().push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sid, _)| *sid != id.0);
    }

    fn notify(&self, value: Option<&CredentialRecord>) {
        // Snapshot first: callbacks may re-enter the store (unsubscribe
        // themselves, set a new record), so the lock must not be held
        // while they run.
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }
}
