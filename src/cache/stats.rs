//! Sweep Statistics Module
//!
//! Tracks what a single GC sweep did.

use serde::Serialize;

// == Sweep Stats ==
/// Outcome of one GC sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Number of entry files deleted
    pub files_removed: u64,
    /// Number of entry files left in place because they are still fresh
    pub files_kept: u64,
    /// Number of files or directories that could not be read or deleted
    pub failures: u64,
    /// Number of directories walked, including the root
    pub directories_visited: u64,
}

impl SweepStats {
    // == Constructor ==
    /// Creates a new SweepStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_removed(&mut self) {
        self.files_removed += 1;
    }

    pub fn record_kept(&mut self) {
        self.files_kept += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn record_directory(&mut self) {
        self.directories_visited += 1;
    }

    /// Total number of entry files seen.
    pub fn files_seen(&self) -> u64 {
        self.files_removed + self.files_kept
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = SweepStats::new();
        assert_eq!(stats.files_removed, 0);
        assert_eq!(stats.files_kept, 0);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.directories_visited, 0);
    }

    #[test]
    fn test_files_seen() {
        let mut stats = SweepStats::new();
        stats.record_removed();
        stats.record_removed();
        stats.record_kept();
        stats.record_failure();
        assert_eq!(stats.files_seen(), 3);
        assert_eq!(stats.failures, 1);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut stats = SweepStats::new();
        stats.record_directory();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["directories_visited"], 1);
    }
}
