//! File Cache Module
//!
//! Cache engine storing one file per entry under a sharded directory tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{
    checked_increment, counter_value, Cache, EnvelopeCodec, Expiry, FileStore, GcTrigger,
    KeyCodec, Serialization, SweepStats, Sweeper, Ttl,
};
use crate::config::FileCacheConfig;
use crate::error::{CacheError, Result};

// == File Cache ==
/// Filesystem-backed cache.
///
/// Holds no entry state in memory: the directory tree is the source of truth
/// and may be shared by several processes.
#[derive(Debug)]
pub struct FileCache {
    config: FileCacheConfig,
    keys: KeyCodec,
    codec: EnvelopeCodec,
    store: FileStore,
    gc: GcTrigger,
}

impl FileCache {
    // == Constructor ==
    /// Validates `config` and creates the cache root if needed.
    pub fn new(config: FileCacheConfig) -> Result<Self> {
        let config = config.validate()?;
        fs::create_dir_all(&config.cache_path)?;

        let keys = KeyCodec::new(
            config.cache_path.clone(),
            config.key_prefix.clone(),
            config.hash_key,
            config.directory_level,
            config.cache_file_suffix.clone(),
        );
        let codec = EnvelopeCodec::new(config.serialization.clone());
        let gc = GcTrigger::new(config.gc_probability);

        info!(
            "File cache ready at {} (directory_level={}, hash_key={}, gc_probability={})",
            config.cache_path.display(),
            config.directory_level,
            config.hash_key,
            config.gc_probability
        );

        Ok(Self {
            config,
            keys,
            codec,
            store: FileStore::new(),
            gc,
        })
    }

    /// Opens a cache at `path` with default options.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(FileCacheConfig::new(path))
    }

    pub fn config(&self) -> &FileCacheConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.keys.root()
    }

    pub fn gc_probability(&self) -> i64 {
        self.gc.probability()
    }

    /// Sets the GC probability, clamped to `[0, 1_000_000]`.
    pub fn set_gc_probability(&mut self, probability: i64) {
        self.gc.set_probability(probability);
    }

    /// Path of the file that holds `key`.
    pub fn cache_file(&self, key: &str) -> Result<PathBuf> {
        self.keys.entry_path(key)
    }

    // == GC ==
    /// Sweeps the cache root: expired entries only, or everything.
    pub fn gc(&self, expired_only: bool) -> SweepStats {
        Sweeper::sweep(self.keys.root(), expired_only)
    }

    fn maybe_gc(&mut self) {
        if self.gc.should_sweep() {
            debug!("GC triggered by write");
            self.gc(true);
        }
    }

    /// Encodes a value, turning serializer failures other than caller
    /// errors into `None`.
    fn encode(&self, key: &str, value: &Value) -> Result<Option<Vec<u8>>> {
        match self.codec.encode(value) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e @ CacheError::InvalidArgument(_)) => Err(e),
            Err(e) => {
                warn!("Failed to encode value for key {}: {}", key, e);
                Ok(None)
            }
        }
    }

    fn write(&mut self, key: &str, value: &Value, expiry: Expiry) -> Result<bool> {
        let path = self.cache_file(key)?;
        let Some(bytes) = self.encode(key, value)? else {
            return Ok(false);
        };
        self.maybe_gc();
        Ok(self.store.write(&path, &bytes, expiry))
    }

    fn counter(&self, n: i64) -> Value {
        match self.config.serialization {
            Serialization::Disabled => Value::String(n.to_string()),
            _ => Value::from(n),
        }
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.cache_file(key)?;
        Ok(self
            .store
            .read(&path)
            .and_then(|bytes| self.codec.decode(&bytes)))
    }

    fn set(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        let expiry = Expiry::from_ttl(ttl, SystemTime::now());
        self.write(key, value, expiry)
    }

    fn add(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        let path = self.cache_file(key)?;
        let Some(bytes) = self.encode(key, value)? else {
            return Ok(false);
        };
        self.maybe_gc();
        let expiry = Expiry::from_ttl(ttl, SystemTime::now());
        Ok(self.store.add_if_absent(&path, &bytes, expiry))
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let path = self.cache_file(key)?;
        Ok(self.store.remove(&path))
    }

    fn increment(&mut self, key: &str, delta: i64) -> Result<i64> {
        let path = self.cache_file(key)?;
        let expires_at = self.store.expires_at(&path);
        let current = match expires_at {
            Some(_) => self
                .store
                .read(&path)
                .and_then(|bytes| self.codec.decode(&bytes)),
            None => None,
        };

        let (next, expiry) = match (current, expires_at) {
            (Some(value), Some(at)) => {
                let current = counter_value(key, &value)?;
                (checked_increment(key, current, delta)?, Expiry::At(at))
            }
            _ => (delta, Expiry::Never),
        };

        let value = self.counter(next);
        if !self.write(key, &value, expiry)? {
            warn!("Failed to persist incremented value for key {}", key);
        }
        Ok(next)
    }

    fn has(&self, key: &str) -> Result<bool> {
        let path = self.cache_file(key)?;
        Ok(self.store.exists(&path))
    }

    fn clear(&mut self) -> Result<bool> {
        self.gc(false);
        Ok(true)
    }
}
