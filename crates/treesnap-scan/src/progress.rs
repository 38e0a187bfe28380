//! Walk progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a walk.
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// File-like entries (files and symlinks) yielded so far.
    pub files_seen: u64,
    /// Directories yielded so far.
    pub dirs_seen: u64,
    /// Warnings recorded so far.
    pub warnings: u64,
    /// Last path yielded.
    pub current_path: PathBuf,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
    /// Set on the last snapshot of a walk.
    pub finished: bool,
}

impl WalkProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_seen: 0,
            dirs_seen: 0,
            warnings: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
            finished: false,
        }
    }

    /// Calculate walk rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_items() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items seen (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_seen + self.dirs_seen
    }
}

impl Default for WalkProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_seen: u64,
    dirs_seen: u64,
    warnings: u64,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_seen: 0,
            dirs_seen: 0,
            warnings: 0,
            current_path: PathBuf::new(),
        }
    }

    pub fn record_file(&mut self, path: &std::path::Path) -> u64 {
        self.files_seen += 1;
        self.current_path.clear();
        self.current_path.push(path);
        self.files_seen
    }

    pub fn record_dir(&mut self, path: &std::path::Path) {
        self.dirs_seen += 1;
        self.current_path.clear();
        self.current_path.push(path);
    }

    pub fn record_warning(&mut self) {
        self.warnings += 1;
    }

    pub fn snapshot(&self, finished: bool) -> WalkProgress {
        WalkProgress {
            files_seen: self.files_seen,
            dirs_seen: self.dirs_seen,
            warnings: self.warnings,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
            finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_tracker_snapshot() {
        let mut tracker = ProgressTracker::new();
        tracker.record_dir(Path::new("/r/a"));
        tracker.record_file(Path::new("/r/a/x"));
        tracker.record_file(Path::new("/r/a/y"));
        tracker.record_warning();

        let progress = tracker.snapshot(true);
        assert_eq!(progress.files_seen, 2);
        assert_eq!(progress.dirs_seen, 1);
        assert_eq!(progress.warnings, 1);
        assert_eq!(progress.total_items(), 3);
        assert_eq!(progress.current_path, Path::new("/r/a/y"));
        assert!(progress.finished);
    }

    #[test]
    fn test_rate_with_zero_elapsed() {
        assert_eq!(WalkProgress::new().entries_per_second(), 0.0);
    }
}
