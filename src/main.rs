//! File Cache - demo binary
//!
//! Opens a file cache configured from the environment, stores a value and
//! reads it back.
//!
//! Usage: `file_cache [KEY] [VALUE] [TTL_SECONDS]`

use std::env;

use anyhow::Context;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_cache::{Cache, FileCache, FileCacheConfig, Ttl};

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FileCacheConfig::from_env();
    info!(
        "Configuration loaded: cache_path={}, directory_level={}, key_prefix={:?}",
        config.cache_path.display(),
        config.directory_level,
        config.key_prefix
    );

    let mut cache = FileCache::new(config).context("failed to open file cache")?;

    let mut args = env::args().skip(1);
    let key = args.next().unwrap_or_else(|| "name".to_string());
    let value = args.next().unwrap_or_else(|| "Ethan".to_string());
    let ttl = match args.next() {
        Some(secs) => Ttl::Seconds(secs.parse().context("TTL must be a whole number of seconds")?),
        None => Ttl::Never,
    };

    // Accept JSON literals, fall back to a plain string
    let value: Value = serde_json::from_str(&value).unwrap_or(Value::String(value));

    if !cache.set(&key, &value, ttl)? {
        anyhow::bail!("failed to write {key:?} to {}", cache.root().display());
    }
    info!("Stored {} at {}", key, cache.cache_file(&key)?.display());

    match cache.get(&key)? {
        Some(Value::String(s)) => println!("{s}"),
        Some(other) => println!("{other}"),
        None => println!("(not found)"),
    }

    Ok(())
}
