//! Configuration Module
//!
//! Handles loading and validating the file cache configuration.

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::cache::{
    Serialization, DEFAULT_GC_PROBABILITY, GC_PROBABILITY_SCALE, MAX_DIRECTORY_LEVEL,
};
use crate::error::{CacheError, Result};

/// Directory name used under the system temp dir when no root is given.
const DEFAULT_DIR_NAME: &str = "file-cache";

/// File cache configuration parameters.
///
/// Option names follow the camelCase spelling (`cachePath`, `directoryLevel`,
/// ...) when loaded from JSON. Unknown options are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FileCacheConfig {
    /// Root directory holding all cache entries
    pub cache_path: PathBuf,
    /// Suffix appended to every entry file name
    pub cache_file_suffix: String,
    /// Number of two-character shard directories between root and entry
    pub directory_level: u32,
    /// Prefix prepended to every logical key before hashing
    pub key_prefix: String,
    /// Whether storage keys are md5 digests of `prefix + key`
    pub hash_key: bool,
    /// Chance (out of 1,000,000) that a write triggers an expired-only sweep
    pub gc_probability: i64,
    /// How values are turned into bytes
    #[serde(skip)]
    pub serialization: Serialization,
}

impl FileCacheConfig {
    /// Creates a config rooted at `cache_path` with all other options defaulted.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            ..Self::default()
        }
    }

    /// Creates a new config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - Cache root (default: `<temp dir>/file-cache`)
    /// - `CACHE_FILE_SUFFIX` - Entry file suffix (default: `.bin`)
    /// - `CACHE_DIRECTORY_LEVEL` - Shard depth (default: 1)
    /// - `CACHE_KEY_PREFIX` - Key prefix (default: empty)
    /// - `CACHE_HASH_KEY` - Hash storage keys, `true`/`false`/`1`/`0`/`yes`/`no` (default: true)
    /// - `CACHE_GC_PROBABILITY` - GC chance per million writes (default: 100)
    ///
    /// A value that does not parse is logged and replaced by the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_path: env::var("CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_file_suffix: env::var("CACHE_FILE_SUFFIX")
                .ok()
                .unwrap_or(defaults.cache_file_suffix),
            directory_level: parse_env("CACHE_DIRECTORY_LEVEL", |v| v.parse().ok())
                .unwrap_or(defaults.directory_level),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .unwrap_or(defaults.key_prefix),
            hash_key: parse_env("CACHE_HASH_KEY", parse_flag).unwrap_or(defaults.hash_key),
            gc_probability: parse_env("CACHE_GC_PROBABILITY", |v| v.parse().ok())
                .unwrap_or(defaults.gc_probability),
            serialization: Serialization::Default,
        }
    }

    /// Parses a JSON object of options, e.g. `{"cachePath": "/tmp/c", "hashKey": false}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::InvalidConfig(e.to_string()))
    }

    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.cache_file_suffix = suffix.into();
        self
    }

    pub fn with_directory_level(mut self, level: u32) -> Self {
        self.directory_level = level;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_hash_key(mut self, hash_key: bool) -> Self {
        self.hash_key = hash_key;
        self
    }

    pub fn with_gc_probability(mut self, probability: i64) -> Self {
        self.gc_probability = probability;
        self
    }

    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = serialization;
        self
    }

    /// Checks the configuration once, before the cache uses it.
    ///
    /// Clamps `gc_probability` into `[0, 1_000_000]`, rejects a directory
    /// level above 16 and a suffix that would escape the entry's directory.
    pub fn validate(mut self) -> Result<Self> {
        if self.directory_level > MAX_DIRECTORY_LEVEL {
            return Err(CacheError::InvalidConfig(format!(
                "directoryLevel must not exceed {}, got {}",
                MAX_DIRECTORY_LEVEL, self.directory_level
            )));
        }
        if self.directory_level > 3 {
            warn!(
                "directoryLevel {} is deeper than the recommended maximum of 3",
                self.directory_level
            );
        }

        if self
            .cache_file_suffix
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0')
        {
            return Err(CacheError::InvalidConfig(format!(
                "cacheFileSuffix contains a path separator: {:?}",
                self.cache_file_suffix
            )));
        }

        if self.cache_path.as_os_str().is_empty() {
            self.cache_path = default_cache_path();
        }

        self.gc_probability = clamp_gc_probability(self.gc_probability);
        Ok(self)
    }
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            cache_file_suffix: ".bin".to_string(),
            directory_level: 1,
            key_prefix: String::new(),
            hash_key: true,
            gc_probability: DEFAULT_GC_PROBABILITY,
            serialization: Serialization::Default,
        }
    }
}

/// Clamps a GC probability into `[0, GC_PROBABILITY_SCALE]`.
pub(crate) fn clamp_gc_probability(value: i64) -> i64 {
    value.clamp(0, GC_PROBABILITY_SCALE)
}

/// Reads and parses `name`, warning when it is set to something unusable.
fn parse_env<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = env::var(name).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!("Ignoring {}={:?}: not a valid value, using the default", name, raw);
    }
    parsed
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_cache_path() -> PathBuf {
    env::temp_dir().join(DEFAULT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = FileCacheConfig::default();
        assert_eq!(config.cache_file_suffix, ".bin");
        assert_eq!(config.directory_level, 1);
        assert_eq!(config.key_prefix, "");
        assert!(config.hash_key);
        assert_eq!(config.gc_probability, 100);
        assert!(config.cache_path.ends_with(DEFAULT_DIR_NAME));
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("CACHE_PATH");
        env::remove_var("CACHE_FILE_SUFFIX");
        env::remove_var("CACHE_DIRECTORY_LEVEL");
        env::remove_var("CACHE_KEY_PREFIX");
        env::remove_var("CACHE_HASH_KEY");
        env::remove_var("CACHE_GC_PROBABILITY");

        let config = FileCacheConfig::from_env();
        assert_eq!(config.cache_file_suffix, ".bin");
        assert_eq!(config.directory_level, 1);
        assert!(config.hash_key);
        assert_eq!(config.gc_probability, 100);

        // Same test so no other from_env call sees these values
        env::set_var("CACHE_HASH_KEY", "0");
        env::set_var("CACHE_DIRECTORY_LEVEL", "two");
        let config = FileCacheConfig::from_env();
        assert!(!config.hash_key);
        assert_eq!(config.directory_level, 1);

        env::set_var("CACHE_HASH_KEY", "maybe");
        assert!(FileCacheConfig::from_env().hash_key);

        env::remove_var("CACHE_HASH_KEY");
        env::remove_var("CACHE_DIRECTORY_LEVEL");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("False"), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config = FileCacheConfig::from_json(
            r#"{"cachePath": "/tmp/c", "keyPrefix": "test", "directoryLevel": 2, "hashKey": false}"#,
        )
        .unwrap();

        assert_eq!(config.cache_path, PathBuf::from("/tmp/c"));
        assert_eq!(config.key_prefix, "test");
        assert_eq!(config.directory_level, 2);
        assert!(!config.hash_key);
        assert_eq!(config.cache_file_suffix, ".bin");
    }

    #[test]
    fn test_config_from_json_rejects_unknown_keys() {
        let result = FileCacheConfig::from_json(r#"{"cachePath": "/tmp/c", "ttl": 5}"#);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_clamps_gc_probability() {
        let high = FileCacheConfig::default()
            .with_gc_probability(5_000_000)
            .validate()
            .unwrap();
        assert_eq!(high.gc_probability, 1_000_000);

        let low = FileCacheConfig::default()
            .with_gc_probability(-3)
            .validate()
            .unwrap();
        assert_eq!(low.gc_probability, 0);
    }

    #[test]
    fn test_validate_directory_level_cap() {
        assert!(FileCacheConfig::default()
            .with_directory_level(16)
            .validate()
            .is_ok());

        let result = FileCacheConfig::default()
            .with_directory_level(17)
            .validate();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_separator_in_suffix() {
        let result = FileCacheConfig::default()
            .with_file_suffix("/../x")
            .validate();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }
}
