//! File Cache - A key-value cache with interchangeable backends
//!
//! Provides a uniform get/set/add/delete/increment contract over an
//! in-memory map and a sharded, filesystem-backed store with TTL expiration.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{ArrayCache, BackendKind, Cache, CacheBackend, FileCache, Serialization, Ttl};
pub use config::FileCacheConfig;
pub use error::{CacheError, Result};
