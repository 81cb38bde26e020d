//! File Store Module
//!
//! Reads and writes single cache entry files. An entry's expiry instant is
//! its file modification time; an entry is fresh while that time is still
//! in the future.

use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::cache::{Ttl, NEVER_EXPIRE_SECS};

/// Per-directory lock file taken by writers and expired-entry removal.
pub(crate) const LOCK_FILE_NAME: &str = ".lock";

// == Expiry ==
/// Absolute expiry of an entry being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Stamped as `now + one year`
    Never,
    /// Stamped as this instant
    At(SystemTime),
}

impl Expiry {
    /// Converts a relative TTL into an absolute expiry measured from `now`.
    pub fn from_ttl(ttl: Ttl, now: SystemTime) -> Self {
        match ttl.expires_at(now) {
            Some(at) => Expiry::At(at),
            None => Expiry::Never,
        }
    }
}

// == File Store ==
/// Entry-level file I/O.
///
/// Failures never propagate: writes report `false`, reads report `None`.
#[derive(Debug, Clone)]
pub struct FileStore {
    never_expire: Duration,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    pub fn new() -> Self {
        Self {
            never_expire: Duration::from_secs(NEVER_EXPIRE_SECS),
        }
    }

    // == Write ==
    /// Writes `bytes` to a temp file beside `path`, stamps the expiry as its
    /// modification time, then renames it over `path`.
    ///
    /// Readers see either the previous entry or the new one, never a partial
    /// body.
    pub fn write(&self, path: &Path, bytes: &[u8], expiry: Expiry) -> bool {
        let expire_at = self.resolve_expiry(expiry);
        match write_entry(path, bytes, expire_at) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write cache file {}: {}", path.display(), e);
                false
            }
        }
    }

    // == Read ==
    /// Returns the entry's bytes if it is still fresh.
    ///
    /// An expired entry is deleted on the way out.
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                log_open_error(path, &e);
                return None;
            }
        };

        let fresh = match file.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified > SystemTime::now(),
            Err(e) => {
                warn!("Failed to stat cache file {}: {}", path.display(), e);
                return None;
            }
        };

        if !fresh {
            drop(file);
            self.remove_expired(path);
            return None;
        }

        let mut bytes = Vec::new();
        match file.read_to_end(&mut bytes) {
            Ok(_) => Some(bytes),
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    // == Exists ==
    /// True iff a fresh entry exists at `path`. Deletes it if it has expired.
    pub fn exists(&self, path: &Path) -> bool {
        self.expires_at(path).is_some()
    }

    /// Expiry instant of a fresh entry, or `None` if absent or expired.
    pub fn expires_at(&self, path: &Path) -> Option<SystemTime> {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                log_open_error(path, &e);
                return None;
            }
        };

        if modified > SystemTime::now() {
            Some(modified)
        } else {
            self.remove_expired(path);
            None
        }
    }

    // == Remove ==
    /// Unlinks the entry. A missing file counts as success.
    pub fn remove(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to remove cache file {}: {}", path.display(), e);
                false
            }
        }
    }

    // == Add If Absent ==
    /// Writes only when no fresh entry exists.
    ///
    /// Not atomic across processes: concurrent callers may both write.
    pub fn add_if_absent(&self, path: &Path, bytes: &[u8], expiry: Expiry) -> bool {
        if self.exists(path) {
            return false;
        }
        self.write(path, bytes, expiry)
    }

    fn resolve_expiry(&self, expiry: Expiry) -> SystemTime {
        match expiry {
            Expiry::At(at) => at,
            Expiry::Never => SystemTime::now() + self.never_expire,
        }
    }

    fn remove_expired(&self, path: &Path) {
        match remove_if_expired(path) {
            Ok(true) => debug!("Removed expired cache file {}", path.display()),
            Ok(false) => {}
            Err(e) => warn!(
                "Failed to remove expired cache file {}: {}",
                path.display(),
                e
            ),
        }
    }
}

// == Directory Lock ==
/// Exclusive lock on the `.lock` file of an entry's directory.
///
/// Serializes writers against expired-entry removal in that directory. The
/// lock file is never deleted, so every process locks the same inode.
#[derive(Debug)]
struct DirectoryLock {
    lock_file: File,
}

impl DirectoryLock {
    fn acquire(directory: &Path) -> io::Result<Self> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(directory.join(LOCK_FILE_NAME))?;
        FileExt::lock_exclusive(&lock_file)?;
        Ok(Self { lock_file })
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}

fn entry_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Unlinks `path` if it is still expired once the directory lock is held.
///
/// Returns `Ok(false)` when the file is gone or was rewritten as fresh.
pub(crate) fn remove_if_expired(path: &Path) -> io::Result<bool> {
    let _lock = DirectoryLock::acquire(entry_directory(path))?;

    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) if modified > SystemTime::now() => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn write_entry(path: &Path, bytes: &[u8], expire_at: SystemTime) -> io::Result<()> {
    let directory = entry_directory(path);
    fs::create_dir_all(directory)?;

    let _lock = DirectoryLock::acquire(directory)?;
    let temp_path = temp_path_for(path);
    let result =
        write_temp(&temp_path, bytes, expire_at).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, bytes: &[u8], expire_at: SystemTime) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.set_times(FileTimes::new().set_modified(expire_at))
}

/// Dot-prefixed sibling of `path`, skipped by the sweeper.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nonce: u64 = rand::random();
    entry_directory(path).join(format!(".{name}.{nonce:016x}.tmp"))
}

fn log_open_error(path: &Path, e: &io::Error) {
    if e.kind() != io::ErrorKind::NotFound {
        warn!("Failed to open cache file {}: {}", path.display(), e);
    }
}
