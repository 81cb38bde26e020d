//! Backend Selection Module
//!
//! Picks a cache implementation at construction time behind one type.

use serde_json::Value;

use crate::cache::{ArrayCache, Cache, FileCache, Ttl};
use crate::config::FileCacheConfig;
use crate::error::Result;

/// Which backend to build.
#[derive(Debug, Clone)]
pub enum BackendKind {
    /// In-memory map, lost when the cache is dropped
    Array,
    /// Sharded files under a root directory
    File(FileCacheConfig),
}

/// A cache whose backend was chosen at runtime.
#[derive(Debug)]
pub enum CacheBackend {
    Array(ArrayCache),
    File(FileCache),
}

impl CacheBackend {
    pub fn new(kind: BackendKind) -> Result<Self> {
        Ok(match kind {
            BackendKind::Array => CacheBackend::Array(ArrayCache::new()),
            BackendKind::File(config) => CacheBackend::File(FileCache::new(config)?),
        })
    }

    fn inner(&self) -> &dyn Cache {
        match self {
            CacheBackend::Array(cache) => cache,
            CacheBackend::File(cache) => cache,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Cache {
        match self {
            CacheBackend::Array(cache) => cache,
            CacheBackend::File(cache) => cache,
        }
    }
}

impl Cache for CacheBackend {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner().get(key)
    }

    fn set(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        self.inner_mut().set(key, value, ttl)
    }

    fn add(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        self.inner_mut().add(key, value, ttl)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        self.inner_mut().delete(key)
    }

    fn increment(&mut self, key: &str, delta: i64) -> Result<i64> {
        self.inner_mut().increment(key, delta)
    }

    fn has(&self, key: &str) -> Result<bool> {
        self.inner().has(key)
    }

    fn clear(&mut self) -> Result<bool> {
        self.inner_mut().clear()
    }
}

impl From<ArrayCache> for CacheBackend {
    fn from(cache: ArrayCache) -> Self {
        CacheBackend::Array(cache)
    }
}

impl From<FileCache> for CacheBackend {
    fn from(cache: FileCache) -> Self {
        CacheBackend::File(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn exercise(cache: &mut CacheBackend) {
        assert!(cache.set("a", &json!(false), Ttl::Never).unwrap());
        assert_eq!(cache.get("a").unwrap(), Some(json!(false)));
        assert!(!cache.add("a", &json!(true), Ttl::Never).unwrap());
        assert_eq!(cache.increment("n", 2).unwrap(), 2);
        assert_eq!(cache.increment("n", 3).unwrap(), 5);
        assert!(cache.delete("a").unwrap());
        assert!(!cache.has("a").unwrap());
        assert!(cache.flush().unwrap());
        assert!(!cache.has("n").unwrap());
    }

    #[test]
    fn test_array_backend() {
        let mut cache = CacheBackend::new(BackendKind::Array).unwrap();
        exercise(&mut cache);
    }

    #[test]
    fn test_file_backend() {
        let dir = TempDir::new().unwrap();
        let mut cache =
            CacheBackend::new(BackendKind::File(FileCacheConfig::new(dir.path()))).unwrap();
        exercise(&mut cache);
    }
}
