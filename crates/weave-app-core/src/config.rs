// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Keyed JSON settings over a pluggable blob store.
//!
//! Hosts decide where settings live by implementing [`ConfigStore`]; the
//! [`ConfigService`] owns the encoding. Values are stored as pretty-printed
//! JSON so users can edit them by hand.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

/// Storage port for raw settings blobs, keyed by logical name.
pub trait ConfigStore {
    /// Reads the blob stored under `key`; [`ConfigError::NotFound`] when absent.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Replaces the blob stored under `key`.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Errors raised while reading or writing settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing is stored under the key.
    #[error("no settings stored under {key:?}")]
    NotFound {
        /// Requested key.
        key: String,
    },
    /// The stored blob is not valid JSON for the requested type.
    #[error("settings under {key:?} are malformed: {source}")]
    Serde {
        /// Key of the blob.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A value decoded fine but cannot be used.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The backing store failed.
    #[error("settings store failed: {0}")]
    Store(String),
}

/// Serializes settings values and delegates storage to a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wraps `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwraps the backing store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Decodes the value stored under `key`; `Ok(None)` when nothing (or an
    /// empty blob) is stored.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let bytes = match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => return Ok(None),
            Ok(bytes) => bytes,
            Err(ConfigError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| ConfigError::Serde {
                key: key.to_owned(),
                source,
            })
    }

    /// Like [`load`](Self::load), falling back to `T::default()`.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_else(|| {
            debug!(key, "no stored settings; using defaults");
            T::default()
        }))
    }

    /// Encodes `value` and stores it under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value).map_err(|source| ConfigError::Serde {
            key: key.to_owned(),
            source,
        })?;
        self.store.save_raw(key, &data)?;
        debug!(key, bytes = data.len(), "saved settings");
        Ok(())
    }

    /// Loads the value under `key` (or its default), lets `edit` change it and
    /// stores the result. Returns the stored value.
    pub fn update<T, F>(&self, key: &str, edit: F) -> Result<T, ConfigError>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let mut value = self.load_or_default(key)?;
        edit(&mut value);
        self.save(key, &value)?;
        Ok(value)
    }
}
