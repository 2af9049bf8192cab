use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Injectable key/value session storage.
///
/// Stands in for the browser storage the original client leaned on for its
/// token, favorites, draft checkout and payment snapshots. Components take
/// this as a dependency instead of touching an ambient global, so they stay
/// testable outside any browser-like host.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// Well-known session keys.
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const FAVORITES: &str = "favorite_products";
    pub const CART_CACHE: &str = "cart_cache";
    pub const DRAFT_CHECKOUT: &str = "draft_checkout";

    /// Transient per-payment-code status snapshot, so a reload during
    /// bank-transfer polling can resume where it left off.
    pub fn payment_snapshot(payment_code: &str) -> String {
        format!("payment:{payment_code}")
    }
}

/// Read a JSON-encoded value from the store. Unparsable entries are treated
/// as absent rather than surfaced as errors.
pub fn get_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    serde_json::from_str(&raw).ok()
}

/// Write a JSON-encoded value to the store. Serialization of the plain data
/// types stored here does not fail; if it ever did the entry is dropped.
pub fn set_json<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) {
    if let Ok(raw) = serde_json::to_string(value) {
        store.set(key, &raw);
    }
}

/// Cached favorite-product id list.
pub fn favorites(store: &dyn SessionStore) -> Vec<String> {
    get_json(store, keys::FAVORITES).unwrap_or_default()
}

pub fn set_favorites(store: &dyn SessionStore, ids: &[String]) {
    set_json(store, keys::FAVORITES, &ids);
}

/// Mutexed in-memory store for tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
