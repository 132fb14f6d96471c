//! Persistence boundary.
//!
//! Everything the matcher remembers lives behind [`Store`]: a key-value
//! store of JSON documents. Backings only provide raw get/put/delete; the
//! typed operations are shared and fail closed, so a missing or corrupt
//! value reads as "nothing saved yet".

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::models::{Digest, Preferences, ScoredJob, StatusMap};

pub const PREFERENCES_KEY: &str = "preferences";
pub const SAVED_JOBS_KEY: &str = "saved_jobs";
pub const STATUS_KEY: &str = "job_status";
pub const DIGEST_KEY_PREFIX: &str = "digest:";

pub fn digest_key(day: NaiveDate) -> String {
    format!("{}{}", DIGEST_KEY_PREFIX, day.format("%Y-%m-%d"))
}

/// Errors from writing to a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait Store {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete_raw(&self, key: &str) -> Result<(), StoreError>;

    fn load_preferences(&self) -> Option<Preferences> {
        load_json(self, PREFERENCES_KEY)
    }

    fn save_preferences(&self, prefs: &Preferences) -> Result<(), StoreError> {
        save_json(self, PREFERENCES_KEY, prefs)
    }

    fn clear_preferences(&self) -> Result<(), StoreError> {
        self.delete_raw(PREFERENCES_KEY)
    }

    fn load_status_map(&self) -> StatusMap {
        load_json(self, STATUS_KEY).unwrap_or_default()
    }

    /// Like [`Store::load_status_map`], but a failed read is an error rather
    /// than an empty map. Used before writing the map back.
    fn try_load_status_map(&self) -> Result<StatusMap, StoreError> {
        Ok(try_load_json(self, STATUS_KEY)?.unwrap_or_default())
    }

    fn save_status_map(&self, map: &StatusMap) -> Result<(), StoreError> {
        save_json(self, STATUS_KEY, map)
    }

    fn load_digest(&self, day: NaiveDate) -> Option<Digest> {
        let entries: Vec<ScoredJob> = load_json(self, &digest_key(day))?;
        Some(Digest { date: day, entries })
    }

    fn save_digest(&self, day: NaiveDate, digest: &Digest) -> Result<(), StoreError> {
        save_json(self, &digest_key(day), &digest.entries)
    }

    fn load_saved_ids(&self) -> Vec<String> {
        load_json(self, SAVED_JOBS_KEY).unwrap_or_default()
    }

    fn try_load_saved_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(try_load_json(self, SAVED_JOBS_KEY)?.unwrap_or_default())
    }

    fn save_saved_ids(&self, ids: &[String]) -> Result<(), StoreError> {
        save_json(self, SAVED_JOBS_KEY, &ids)
    }
}

fn load_json<S, T>(store: &S, key: &str) -> Option<T>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    try_load_json(store, key).unwrap_or_else(|e| {
        warn!(key, error = %e, "failed to read stored value, using defaults");
        None
    })
}

/// Read errors propagate; a malformed value reads as absent.
fn try_load_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = store.get_raw(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed stored value");
            Ok(None)
        }
    }
}

fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: Store + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.put_raw(key, &raw)
}

/// In-process backing for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_raw(&self, key: &str) -> Result<(), StoreError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}
