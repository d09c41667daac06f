//! Storage
//!
//! Local key-value persistence modelled on the browser's `localStorage`:
//! string keys to string values, synchronous reads and writes, and one
//! store per browsing profile. Values are opaque here; the cart serializes
//! its snapshot to JSON before handing it over.

use std::{fs, path::PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Key under which the cart snapshot is persisted.
pub const CART_SNAPSHOT_KEY: &str = "nextsite_cart";

/// Key holding the per-profile earned discount code.
pub const EARNED_CODE_KEY: &str = "user_discount_code";

/// Key holding the email captured by the discount offer popup.
pub const CAPTURED_EMAIL_KEY: &str = "user_email";

/// Key holding the date the discount offer popup was last shown.
pub const POPUP_SEEN_KEY: &str = "discount_popup_seen";

/// Errors raised by a key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error reading or writing the backing file.
    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be serialized.
    #[error("failed to encode store contents: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous string key-value store.
///
/// Reads are infallible: a missing or unreadable value is simply absent.
/// Writes may fail (quota, disabled storage); callers that must not block
/// the user on persistence log the failure and continue in memory.
pub trait KeyValueStore {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the value could not be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the removal could not be persisted.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Purely in-memory store; state is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);

        Ok(())
    }
}

/// File-backed store holding the whole key space as one JSON object.
///
/// Every mutation rewrites the file before returning, so storage and
/// memory never diverge within a session.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: FxHashMap<String, String>,
}

impl JsonFileStore {
    /// Open a store at `path`.
    ///
    /// A missing or malformed file yields an empty store rather than an
    /// error; the malformed case is logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "store file was malformed; starting empty");

                    FxHashMap::default()
                }
            },
            Err(_missing) => FxHashMap::default(),
        };

        Self { path, entries }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let contents = serde_json::to_string(&self.entries)?;

        fs::write(&self.path, contents)?;

        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());

        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);

        self.flush()
    }
}
