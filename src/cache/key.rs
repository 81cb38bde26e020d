//! Key Codec Module
//!
//! Maps logical cache keys to storage keys and sharded entry paths.

use std::path::{Path, PathBuf};

use crate::cache::MAX_FILE_NAME_LEN;
use crate::error::{CacheError, Result};

// == Key Codec ==
/// Resolves logical keys to on-disk locations.
///
/// With `hash_key` on, the storage key is the hex md5 of `prefix + key`;
/// otherwise it is `prefix + key` verbatim and must be a safe file name.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    root: PathBuf,
    prefix: String,
    hash_key: bool,
    directory_level: u32,
    suffix: String,
}

impl KeyCodec {
    pub fn new(
        root: impl Into<PathBuf>,
        prefix: impl Into<String>,
        hash_key: bool,
        directory_level: u32,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            hash_key,
            directory_level,
            suffix: suffix.into(),
        }
    }

    /// Root directory all entries live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // == Resolve ==
    /// Derives the storage key for a logical key.
    pub fn resolve(&self, key: &str) -> Result<String> {
        let raw = format!("{}{}", self.prefix, key);
        if self.hash_key {
            return Ok(format!("{:x}", md5::compute(raw.as_bytes())));
        }

        if raw.is_empty() {
            return Err(CacheError::InvalidKey(
                "empty key with no prefix has no file name".to_string(),
            ));
        }
        if raw.starts_with('.') {
            return Err(CacheError::InvalidKey(format!(
                "key {raw:?} must not start with '.'"
            )));
        }
        if raw
            .chars()
            .step_by(2)
            .take(self.directory_level as usize)
            .any(|c| c == '.')
        {
            return Err(CacheError::InvalidKey(format!(
                "key {raw:?} would create a shard directory starting with '.'"
            )));
        }
        if raw.chars().any(|c| c == '/' || c == '\\' || c == '\0') {
            return Err(CacheError::InvalidKey(format!(
                "key {raw:?} contains a path separator"
            )));
        }
        if raw.len() + self.suffix.len() > MAX_FILE_NAME_LEN {
            return Err(CacheError::InvalidKey(format!(
                "key {raw:?} is too long for a file name"
            )));
        }
        Ok(raw)
    }

    // == Path For ==
    /// Builds `root/[shard.../]storage_key+suffix`.
    ///
    /// Shard `i` is characters `[2i, 2i + 2)` of the storage key. Shards past
    /// the end of a short key are left out.
    pub fn path_for(&self, storage_key: &str) -> PathBuf {
        let mut path = self.root.clone();
        let chars: Vec<char> = storage_key.chars().collect();

        for level in 0..self.directory_level as usize {
            let start = level * 2;
            if start >= chars.len() {
                break;
            }
            let end = (start + 2).min(chars.len());
            let shard: String = chars[start..end].iter().collect();
            path.push(shard);
        }

        path.push(format!("{}{}", storage_key, self.suffix));
        path
    }

    /// `resolve` followed by `path_for`.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        let storage_key = self.resolve(key)?;
        Ok(self.path_for(&storage_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(hash_key: bool, level: u32) -> KeyCodec {
        KeyCodec::new("/cache", "test", hash_key, level, ".bin")
    }

    #[test]
    fn test_resolve_hashed() {
        let storage_key = codec(true, 1).resolve("name").unwrap();
        assert_eq!(storage_key, format!("{:x}", md5::compute("testname")));
        assert_eq!(storage_key.len(), 32);
        assert!(storage_key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let codec = codec(true, 1);
        assert_eq!(codec.resolve("a").unwrap(), codec.resolve("a").unwrap());
        assert_ne!(codec.resolve("a").unwrap(), codec.resolve("b").unwrap());
    }

    #[test]
    fn test_resolve_verbatim() {
        assert_eq!(codec(false, 1).resolve("name").unwrap(), "testname");
    }

    #[test]
    fn test_resolve_rejects_unsafe_verbatim_keys() {
        let verbatim = KeyCodec::new("/cache", "", false, 1, ".bin");
        assert!(matches!(verbatim.resolve(""), Err(CacheError::InvalidKey(_))));
        assert!(matches!(verbatim.resolve("a/b"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(verbatim.resolve("a\\b"), Err(CacheError::InvalidKey(_))));
        assert!(matches!(verbatim.resolve(".."), Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            verbatim.resolve(&"x".repeat(300)),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_dot_shards() {
        let deep = KeyCodec::new("/cache", "", false, 3, ".bin");
        assert!(matches!(deep.resolve("ab..cd"), Err(CacheError::InvalidKey(_))));
        assert!(deep.resolve("a.b.c.").is_ok());
    }

    #[test]
    fn test_hashed_keys_accept_anything() {
        let codec = KeyCodec::new("/cache", "", true, 1, ".bin");
        assert!(codec.resolve("../../etc/passwd").is_ok());
        assert!(codec.resolve(&"x".repeat(300)).is_ok());
        assert_eq!(codec.resolve("").unwrap(), format!("{:x}", md5::compute("")));
    }

    #[test]
    fn test_empty_key_uses_prefix() {
        assert_eq!(
            codec(true, 1).resolve("").unwrap(),
            format!("{:x}", md5::compute("test"))
        );
        assert_eq!(codec(false, 1).resolve("").unwrap(), "test");
    }

    #[test]
    fn test_path_for_two_levels() {
        let path = codec(true, 2).path_for("abcd1234");
        assert_eq!(path, PathBuf::from("/cache/ab/cd/abcd1234.bin"));
    }

    #[test]
    fn test_path_for_level_zero() {
        let path = codec(true, 0).path_for("abcd1234");
        assert_eq!(path, PathBuf::from("/cache/abcd1234.bin"));
    }

    #[test]
    fn test_path_for_omits_missing_shards() {
        let path = codec(false, 4).path_for("abc");
        assert_eq!(path, PathBuf::from("/cache/ab/c/abc.bin"));
    }
}
