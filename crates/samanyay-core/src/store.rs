//! Persistent Store
//!
//! A flat key/value substrate holding JSON documents. Every other component
//! reads and writes through [`Store`], which adds a namespace prefix, typed
//! load/save helpers and a serialized read-modify-write.
//!
//! ```text
//! samanyay:accounts           -> [Account, ...]
//! samanyay:session.current    -> "account-id"
//! samanyay:cases.<accountId>  -> [Case, ...]
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{CoreError, Result};

/// Default namespace prepended to every key
pub const DEFAULT_NAMESPACE: &str = "samanyay";

/// Well-known keys
pub mod keys {
    use crate::account::AccountId;

    /// Registered accounts
    pub const ACCOUNTS: &str = "accounts";

    /// Id of the signed-in account
    pub const CURRENT_SESSION: &str = "session.current";

    /// Case partition for one account
    pub fn cases(account_id: &AccountId) -> String {
        format!("cases.{account_id}")
    }
}

/// Raw key/value backend
///
/// Reads of a missing key return `Ok(None)`. Writes overwrite the whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

fn poisoned<E>(_: E) -> CoreError {
    CoreError::StoreUnavailable("store lock poisoned".into())
}

/// In-memory store (for development/testing)
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Durable store backed by a single JSON object file
///
/// The file is loaded once on open and rewritten in full on every mutation.
/// A mutation becomes visible to readers only once the file write succeeds.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| CoreError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(CoreError::StoreUnavailable(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened file store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::StoreUnavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents).map_err(|e| {
            CoreError::StoreUnavailable(format!("cannot write {}: {e}", self.path.display()))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Namespaced, typed view over a [`KeyValueStore`]
///
/// Clones share the backend and the write lock, so read-modify-write
/// sequences issued through any clone never interleave.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    /// Wrap a backend using the default namespace
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(backend, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(backend: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Fresh in-memory store
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn full_key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.namespace)
        }
    }

    /// Load a document, or `None` when the key is absent
    pub fn load_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.full_key(key);
        match self.backend.get(&full_key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CoreError::Corrupt {
                    key: full_key,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Load a document, falling back to its default when the key is absent
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        Ok(self.load_opt(key)?.unwrap_or_default())
    }

    /// Overwrite a document
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(&self.full_key(key), &raw)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(&self.full_key(key))
    }

    /// Read, mutate and write back a document as one serialized step
    ///
    /// Nothing is written when `apply` fails.
    pub fn update<T, R, F>(&self, key: &str, apply: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut doc: T = self.load(key)?;
        let out = apply(&mut doc)?;
        self.save(key, &doc)?;
        Ok(out)
    }
}
