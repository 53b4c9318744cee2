//! Key-value persistence boundary.
//!
//! Each module owns a key space (a namespace) and stores JSON values under
//! string keys.  There are no cross-module transactions.  Keys that belong to
//! a chat are conventionally the chat id, or `<chat id>:<suffix>`, so a chat
//! migration is a [`Namespace::rename`] plus a [`Namespace::rename_prefix`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A namespaced key-value store.
pub trait Store: Send + Sync + 'static {
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;

    fn set(&self, namespace: &str, key: &str, value: Value);

    fn remove(&self, namespace: &str, key: &str) -> Option<Value>;

    /// All keys of a namespace, in ascending order.
    fn keys(&self, namespace: &str) -> Vec<String>;
}

/// In-process [`Store`]; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    spaces: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.spaces.read().get(namespace)?.get(key).cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: Value) {
        self.spaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn remove(&self, namespace: &str, key: &str) -> Option<Value> {
        self.spaces.write().get_mut(namespace)?.remove(key)
    }

    fn keys(&self, namespace: &str) -> Vec<String> {
        self.spaces
            .read()
            .get(namespace)
            .map(|space| space.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Typed view over one namespace of a [`Store`].
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn Store>,
    name: String,
}

impl Namespace {
    pub fn new(store: Arc<dyn Store>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads and deserialises `key`; `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        self.store
            .get(&self.name, key)
            .map(serde_json::from_value)
            .transpose()
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> serde_json::Result<()> {
        self.store.set(&self.name, key, serde_json::to_value(value)?);
        Ok(())
    }

    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.store.get(&self.name, key)
    }

    pub fn set_raw(&self, key: &str, value: Value) {
        self.store.set(&self.name, key, value);
    }

    /// Removes `key`, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.store.remove(&self.name, key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.get(&self.name, key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys(&self.name)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect()
    }

    /// Moves the value at `from` to `to`, overwriting `to`.
    ///
    /// Returns `false` (and changes nothing) when `from` is absent.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        match self.store.remove(&self.name, from) {
            Some(value) => {
                self.store.set(&self.name, to, value);
                true
            }
            None => false,
        }
    }

    /// Re-keys every `from…` key to `to…`, returning how many moved.
    pub fn rename_prefix(&self, from: &str, to: &str) -> usize {
        let keys = self.keys_with_prefix(from);
        for key in &keys {
            let renamed = format!("{to}{}", &key[from.len()..]);
            self.rename(key, &renamed);
        }
        keys.len()
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(name: &str) -> Namespace {
        Namespace::new(Arc::new(MemoryStore::new()), name)
    }

    #[test]
    fn test_typed_roundtrip_and_missing_key() {
        let rules = ns("rules");
        rules.set("-100", "be nice").unwrap();
        assert_eq!(rules.get::<String>("-100").unwrap().as_deref(), Some("be nice"));
        assert_eq!(rules.get::<String>("-200").unwrap(), None);
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let a = Namespace::new(Arc::clone(&store), "a");
        let b = Namespace::new(store, "b");
        a.set("k", &1).unwrap();
        assert!(!b.contains("k"));
    }

    #[test]
    fn test_rename_prefix_moves_only_matching_keys() {
        let warns = ns("warns");
        warns.set("-100:1", &2).unwrap();
        warns.set("-100:2", &1).unwrap();
        warns.set("-1000:3", &1).unwrap();

        assert_eq!(warns.rename_prefix("-100:", "-200:"), 2);
        assert_eq!(warns.keys(), ["-1000:3", "-200:1", "-200:2"]);
        assert_eq!(warns.get::<u32>("-200:1").unwrap(), Some(2));
    }

    #[test]
    fn test_rename_missing_key_is_noop() {
        let rules = ns("rules");
        assert!(!rules.rename("-1", "-2"));
        assert!(rules.keys().is_empty());
    }
}
