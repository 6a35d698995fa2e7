// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing settings without filesystem I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use weave_app_core::config::{ConfigError, ConfigStore};

/// In-memory implementation of [`ConfigStore`].
///
/// Clones share one backing map, so a test can hand a clone to a
/// [`ConfigService`](weave_app_core::ConfigService) and inspect the original.
/// Load and save attempts are counted, and either path can be told to fail.
///
/// # Example
///
/// ```
/// use weave_dry_tests::InMemoryConfigStore;
/// use weave_app_core::{ConfigService, WeaveConfig};
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// WeaveConfig { keyframe_interval: 64 }.save(&service).unwrap();
/// assert_eq!(store.load_count(), 0);
/// assert_eq!(store.save_count(), 1);
/// assert!(store.contains_key(WeaveConfig::STORE_KEY));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one raw blob under `key`.
    pub fn with_raw(key: &str, data: &[u8]) -> Self {
        let store = Self::new();
        store.state().data.insert(key.to_string(), data.to_vec());
        store
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every following `load_raw` fail.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state().fail_on_load = fail;
    }

    /// Make every following `save_raw` fail.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.state().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.state().load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.state().save_count
    }

    /// Whether a blob is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.state().data.contains_key(key)
    }

    /// Raw blob stored under `key`, bypassing the counters.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.state().data.get(key).cloned()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut state = self.state();
        state.load_count += 1;
        if state.fail_on_load {
            return Err(ConfigError::Store("simulated load failure".into()));
        }
        state
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound {
                key: key.to_owned(),
            })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut state = self.state();
        state.save_count += 1;
        if state.fail_on_save {
            return Err(ConfigError::Store("simulated save failure".into()));
        }
        state.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn missing_key_is_not_found() {
        let store = InMemoryConfigStore::new();
        assert!(matches!(store.load_raw("weave"), Err(ConfigError::NotFound { .. })));
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn failures_are_counted_and_store_nothing() {
        let store = InMemoryConfigStore::new();
        store.set_fail_on_save(true);
        assert!(matches!(
            store.save_raw("weave", b"{}"),
            Err(ConfigError::Store(_))
        ));
        assert_eq!(store.save_count(), 1);
        assert!(!store.contains_key("weave"));
    }

    #[test]
    fn service_blobs_are_readable_json() {
        use weave_app_core::{ConfigService, WeaveConfig};

        let store = InMemoryConfigStore::new();
        let service = ConfigService::new(store.clone());
        WeaveConfig {
            keyframe_interval: 12,
        }
        .save(&service)
        .unwrap();
        let raw = store.raw(WeaveConfig::STORE_KEY).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "keyframe_interval": 12 }));
    }

    #[test]
    fn clones_share_data_and_flags() {
        let store = InMemoryConfigStore::with_raw("weave", b"{}");
        let other = store.clone();
        other.set_fail_on_load(true);
        assert!(store.load_raw("weave").is_err());
        other.set_fail_on_load(false);
        assert_eq!(store.load_raw("weave").unwrap(), b"{}");
        assert_eq!(other.load_count(), 2);
    }
}
