//! Cache Module
//!
//! Uniform key-value cache contract with in-memory and filesystem backends.
//! The filesystem backend shards entries into directories, wraps values in an
//! envelope, and keeps each entry's expiry in the file's modification time.

mod array;
mod backend;
mod entry;
mod envelope;
mod file;
mod file_store;
mod gc;
mod key;
mod stats;
mod ttl;


use std::borrow::Borrow;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

// Re-export public types
pub use array::ArrayCache;
pub use backend::{BackendKind, CacheBackend};
pub use entry::CacheEntry;
pub use envelope::{EnvelopeCodec, JsonSerializer, Serialization, Serializer};
pub use file::FileCache;
pub use file_store::{Expiry, FileStore};
pub use gc::{GcTrigger, Sweeper};
pub use key::KeyCodec;
pub use stats::SweepStats;
pub use ttl::{Interval, Ttl};

// == Public Constants ==
/// Default chance (per million writes) of an opportunistic GC sweep
pub const DEFAULT_GC_PROBABILITY: i64 = 100;

/// Denominator of the GC probability
pub const GC_PROBABILITY_SCALE: i64 = 1_000_000;

/// Deepest allowed shard directory nesting
pub const MAX_DIRECTORY_LEVEL: u32 = 16;

/// Lifetime given to entries that never expire (one year)
pub const NEVER_EXPIRE_SECS: u64 = 31_536_000;

/// Longest file name most filesystems accept, in bytes
pub const MAX_FILE_NAME_LEN: usize = 255;

// == Cache Contract ==
/// Operations every backend implements, so callers can swap backends freely.
///
/// Reads take `&self`; anything that writes takes `&mut self`. Ordinary I/O
/// failures are reported as `Ok(false)` / `Ok(None)`; only malformed input
/// (bad keys, unstorable values) is an `Err`.
pub trait Cache {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`. A `Ttl::Never` entry does not expire.
    fn set(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool>;

    /// Removes `key`. Succeeds whether or not the key existed.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Adds `delta` to the integer stored under `key` and returns the result.
    ///
    /// An absent key is initialized to `delta` without expiry; a present one
    /// keeps its remaining lifetime.
    fn increment(&mut self, key: &str, delta: i64) -> Result<i64>;

    /// True iff a fresh entry exists for `key`.
    fn has(&self, key: &str) -> Result<bool>;

    /// Removes every entry.
    fn clear(&mut self) -> Result<bool>;

    /// Returns the stored value, or `default` if the key is absent.
    fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Stores `value` only if `key` is currently absent.
    ///
    /// Check-then-write: two writers racing on the same absent key may both
    /// succeed, and the later write wins.
    fn add(&mut self, key: &str, value: &Value, ttl: Ttl) -> Result<bool> {
        if self.has(key)? {
            return Ok(false);
        }
        self.set(key, value, ttl)
    }

    /// Alias of [`Cache::clear`].
    fn flush(&mut self) -> Result<bool> {
        self.clear()
    }

    // == Batch Operations ==
    /// Looks up each key, substituting `default` for absent ones.
    ///
    /// The result is keyed by the logical keys in input order; a repeated
    /// key keeps its first position.
    fn get_multiple<I, K>(&self, keys: I, default: &Value) -> Result<IndexMap<String, Value>>
    where
        Self: Sized,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut values = IndexMap::new();
        for key in keys {
            let key = key.as_ref();
            if values.contains_key(key) {
                continue;
            }
            let value = self.get_or(key, default.clone())?;
            values.insert(key.to_string(), value);
        }
        Ok(values)
    }

    /// `get_multiple` with `false` standing in for absent keys.
    fn mget<I, K>(&self, keys: I) -> Result<IndexMap<String, Value>>
    where
        Self: Sized,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.get_multiple(keys, &Value::Bool(false))
    }

    /// Stores every pair with the same TTL. True iff every write succeeded.
    fn set_multiple<I, K, V>(&mut self, values: I, ttl: Ttl) -> Result<bool>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Borrow<Value>,
    {
        let mut all_ok = true;
        for (key, value) in values {
            all_ok &= self.set(key.as_ref(), value.borrow(), ttl)?;
        }
        Ok(all_ok)
    }

    /// Deletes every key. True iff every delete succeeded.
    fn delete_multiple<I, K>(&mut self, keys: I) -> Result<bool>
    where
        Self: Sized,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut all_ok = true;
        for key in keys {
            all_ok &= self.delete(key.as_ref())?;
        }
        Ok(all_ok)
    }

    // == Typed Helpers ==
    /// Reads a value and converts it into `T`.
    fn get_as<T>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
        T: DeserializeOwned,
    {
        self.get(key)?
            .map(|value| serde_json::from_value(value).map_err(CacheError::from))
            .transpose()
    }

    /// Converts `value` into a structural value and stores it.
    fn set_as<T>(&mut self, key: &str, value: &T, ttl: Ttl) -> Result<bool>
    where
        Self: Sized,
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, &value, ttl)
    }
}

// == Shared Helpers ==
/// Reads an integer counter from a stored value.
///
/// Accepts JSON integers and strings holding an integer, the latter being
/// what a cache with serialization disabled hands back.
pub(crate) fn counter_value(key: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CacheError::InvalidArgument(format!("value stored under {key:?} is not an integer"))
    })
}

/// Adds `delta` to `current`, rejecting overflow.
pub(crate) fn checked_increment(key: &str, current: i64, delta: i64) -> Result<i64> {
    current.checked_add(delta).ok_or_else(|| {
        CacheError::InvalidArgument(format!("incrementing {key:?} by {delta} overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_value() {
        assert_eq!(counter_value("k", &json!(41)).unwrap(), 41);
        assert_eq!(counter_value("k", &json!("-7")).unwrap(), -7);
        assert!(matches!(
            counter_value("k", &json!("seven")),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            counter_value("k", &json!(1.5)),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_checked_increment_overflow() {
        assert_eq!(checked_increment("k", 1, 6).unwrap(), 7);
        assert!(checked_increment("k", i64::MAX, 1).is_err());
    }
}
