//! GC Module
//!
//! Recursive sweep of the cache directory, plus the probabilistic trigger
//! that runs it opportunistically before writes.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::cache::file_store::remove_if_expired;
use crate::cache::{SweepStats, GC_PROBABILITY_SCALE};
use crate::config::clamp_gc_probability;

// == Sweeper ==
/// Walks a cache root depth-first and deletes entry files.
///
/// Names starting with `.` are skipped, directories are never removed, and a
/// failure on one file does not stop the walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sweeper;

impl Sweeper {
    /// Deletes expired files under `root`, or every file if `expired_only`
    /// is false.
    pub fn sweep(root: &Path, expired_only: bool) -> SweepStats {
        let mut stats = SweepStats::new();
        let now = SystemTime::now();
        sweep_dir(root, expired_only, now, &mut stats);

        info!(
            "GC sweep of {} (expired_only={}): {} files seen, removed {}, kept {}, {} failures",
            root.display(),
            expired_only,
            stats.files_seen(),
            stats.files_removed,
            stats.files_kept,
            stats.failures
        );
        stats
    }
}

fn sweep_dir(dir: &Path, expired_only: bool, now: SystemTime, stats: &mut SweepStats) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("GC could not read directory {}: {}", dir.display(), e);
            stats.record_failure();
            return;
        }
    };
    stats.record_directory();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("GC skipped unreadable entry in {}: {}", dir.display(), e);
                stats.record_failure();
                continue;
            }
        };

        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            sweep_dir(&path, expired_only, now, stats);
            continue;
        }

        if expired_only {
            match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) if modified >= now => stats.record_kept(),
                // Re-checked under the directory lock before unlinking
                Ok(_) => match remove_if_expired(&path) {
                    Ok(true) => stats.record_removed(),
                    Ok(false) => stats.record_kept(),
                    Err(e) => {
                        debug!("GC could not remove {}: {}", path.display(), e);
                        stats.record_failure();
                    }
                },
                Err(e) => {
                    debug!("GC could not stat {}: {}", path.display(), e);
                    stats.record_failure();
                }
            }
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => stats.record_removed(),
            Err(e) => {
                debug!("GC could not remove {}: {}", path.display(), e);
                stats.record_failure();
            }
        }
    }
}

// == GC Trigger ==
/// Decides whether a write should first run an expired-only sweep.
///
/// A draw in `[0, 1_000_000)` below `probability` triggers the sweep, at most
/// once per trigger. A probability of 0 sweeps before every write.
#[derive(Debug, Clone)]
pub struct GcTrigger {
    probability: i64,
    swept_this_session: bool,
}

impl GcTrigger {
    pub fn new(probability: i64) -> Self {
        Self {
            probability: clamp_gc_probability(probability),
            swept_this_session: false,
        }
    }

    pub fn probability(&self) -> i64 {
        self.probability
    }

    /// Sets the probability, clamped to `[0, 1_000_000]`.
    pub fn set_probability(&mut self, probability: i64) {
        self.probability = clamp_gc_probability(probability);
    }

    /// Draws a random number and reports whether to sweep now.
    pub fn should_sweep(&mut self) -> bool {
        let draw = rand::thread_rng().gen_range(0..GC_PROBABILITY_SCALE);
        self.should_sweep_with(draw)
    }

    pub(crate) fn should_sweep_with(&mut self, draw: i64) -> bool {
        if self.probability == 0 {
            return true;
        }
        if self.swept_this_session || draw >= self.probability {
            return false;
        }
        self.swept_this_session = true;
        true
    }
}
