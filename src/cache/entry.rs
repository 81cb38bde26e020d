//! Cache Entry Module
//!
//! Defines the structure for in-memory cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::cache::Ttl;

// == Cache Entry ==
/// Represents a single in-memory cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring after `ttl`.
    pub fn new(value: Value, ttl: Ttl) -> Self {
        let expires_at = ttl
            .as_seconds()
            .map(|secs| current_timestamp_ms().saturating_add(secs.saturating_mul(1000)));
        Self { value, expires_at }
    }

    /// Creates an entry with an absolute expiry, e.g. to keep a previous
    /// entry's remaining lifetime.
    pub fn with_expiry(value: Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(json!("test_value"), Ttl::Never);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_non_positive_ttl_never_expires() {
        let entry = CacheEntry::new(json!(1), Ttl::Seconds(-1));
        assert!(entry.expires_at.is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!("test_value"), Ttl::Seconds(1));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry::with_expiry(json!("test"), Some(now));

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }
}
