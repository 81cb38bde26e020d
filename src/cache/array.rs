//! Array Cache Module
//!
//! In-memory backend. Entries live only as long as the cache instance.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{checked_increment, counter_value, Cache, CacheEntry, Ttl};
use crate::error::Result;

// == Array Cache ==
/// HashMap-backed cache with per-entry expiry.
#[derive(Debug, Default)]
pub struct ArrayCache {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
}

impl ArrayCache {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Purge Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for ArrayCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.fresh(key).map(|entry| entry.value.clone()))
    }

    fn set(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.clone(), ttl));
        Ok(true)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        self.entries.remove(key);
        Ok(true)
    }

    fn increment(&mut self, key: &str, delta: i64) -> Result<i64> {
        let (next, expires_at) = match self.fresh(key) {
            Some(entry) => {
                let current = counter_value(key, &entry.value)?;
                (checked_increment(key, current, delta)?, entry.expires_at)
            }
            None => (delta, None),
        };
        self.entries.insert(
            key.to_string(),
            CacheEntry::with_expiry(Value::from(next), expires_at),
        );
        Ok(next)
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.fresh(key).is_some())
    }

    fn clear(&mut self) -> Result<bool> {
        self.entries.clear();
        Ok(true)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let cache = ArrayCache::new();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = ArrayCache::new();

        cache.set("key1", &json!("value1"), Ttl::Never).unwrap();

        assert_eq!(cache.get("key1").unwrap(), Some(json!("value1")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_falsy_values_are_present() {
        let mut cache = ArrayCache::new();

        cache.set("b", &json!(false), Ttl::Never).unwrap();
        cache.set("c", &json!(null), Ttl::Never).unwrap();

        assert_eq!(cache.get("b").unwrap(), Some(json!(false)));
        assert_eq!(cache.get("c").unwrap(), Some(json!(null)));
        assert!(cache.has("c").unwrap());
    }

    #[test]
    fn test_overwrite() {
        let mut cache = ArrayCache::new();

        cache.set("key1", &json!("value1"), Ttl::Never).unwrap();
        cache.set("key1", &json!("value2"), Ttl::Never).unwrap();

        assert_eq!(cache.get("key1").unwrap(), Some(json!("value2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut cache = ArrayCache::new();

        cache.set("key1", &json!("value1"), Ttl::Never).unwrap();
        assert!(cache.delete("key1").unwrap());
        assert!(cache.delete("key1").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_expiration() {
        let mut cache = ArrayCache::new();

        cache.set("key1", &json!("value1"), Ttl::Seconds(1)).unwrap();
        assert!(cache.has("key1").unwrap());

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.get("key1").unwrap(), None);
        assert!(!cache.has("key1").unwrap());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_increment() {
        let mut cache = ArrayCache::new();

        cache.set("count", &json!(0), Ttl::Never).unwrap();
        assert_eq!(cache.increment("count", 1).unwrap(), 1);
        assert_eq!(cache.increment("count", 6).unwrap(), 7);
        assert_eq!(cache.increment("fresh", 5).unwrap(), 5);
    }

    #[test]
    fn test_increment_keeps_expiry() {
        let mut cache = ArrayCache::new();

        cache.set("count", &json!(1), Ttl::Seconds(60)).unwrap();
        let before = cache.entries["count"].expires_at;
        cache.increment("count", 1).unwrap();
        assert_eq!(cache.entries["count"].expires_at, before);
    }

    #[test]
    fn test_add_on_present_key() {
        let mut cache = ArrayCache::new();

        assert!(cache.add("k", &json!(1), Ttl::Never).unwrap());
        assert!(!cache.add("k", &json!(2), Ttl::Never).unwrap());
        assert_eq!(cache.get("k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_empty_key_is_a_key() {
        let mut cache = ArrayCache::new();

        assert!(!cache.has("").unwrap());
        assert!(cache.set("", &json!("v"), Ttl::Never).unwrap());
        assert_eq!(cache.get("").unwrap(), Some(json!("v")));
        assert!(cache.delete("").unwrap());
        assert_eq!(cache.get("").unwrap(), None);
    }
}
