//! JWalk-based, error-tolerant directory walker.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jwalk::{DirEntry, Parallelism, WalkDir};
use tokio::sync::broadcast;

use treesnap_core::{Entry, EntryKind, ExclusionSet, SnapError, WalkConfig, WalkWarning};

use crate::progress::{ProgressTracker, WalkProgress};

/// Warnings kept in memory per walk; later ones are only counted.
pub const MAX_RETAINED_WARNINGS: usize = 1024;

/// A progress snapshot is broadcast every this many file entries.
const PROGRESS_INTERVAL: u64 = 1000;

type RawEntry = Result<DirEntry<((), ())>, jwalk::Error>;

/// Walker producing depth-first, pre-order entry sequences.
///
/// Sibling entries are sorted by name. Directories named in the
/// [`ExclusionSet`] are removed from their parent's listing before descent,
/// so they and everything below them are never visited or reported.
pub struct TreeWalker {
    progress_tx: broadcast::Sender<WalkProgress>,
}

impl TreeWalker {
    /// Create a new walker.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> crate::ProgressReceiver {
        self.progress_tx.subscribe()
    }

    /// Start a walk.
    ///
    /// Fails with [`SnapError::RootNotFound`] if the root is missing, is not
    /// a directory, or cannot be listed. Everything after that is reported
    /// as warnings on the returned [`Walk`].
    pub fn walk(&self, config: &WalkConfig) -> Result<Walk<'static>, SnapError> {
        let root = open_root(&config.root)?;
        let exclusions = config.exclusions.clone();

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(&root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .max_depth(config.max_depth.unwrap_or(usize::MAX))
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => !is_excluded_dir(&exclusions, entry),
                    Err(_) => true,
                });
            });

        tracing::debug!(root = %root.display(), threads = config.threads, "starting walk");

        Ok(Walk {
            root,
            inner: Box::new(walker.into_iter()),
            on_warning: None,
            warnings: Vec::new(),
            warning_count: 0,
            tracker: ProgressTracker::new(),
            progress_tx: self.progress_tx.clone(),
            unreadable_dir: None,
            finished: false,
        })
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `root` with the given exclusions and default settings.
pub fn walk(root: impl Into<PathBuf>, exclusions: ExclusionSet) -> Result<Walk<'static>, SnapError> {
    TreeWalker::new().walk(&WalkConfig::new(root).with_exclusions(exclusions))
}

fn is_excluded_dir(exclusions: &ExclusionSet, entry: &DirEntry<((), ())>) -> bool {
    entry.file_type().is_dir() && exclusions.excludes(&entry.file_name().to_string_lossy())
}

/// Resolve the root and make sure it can be listed.
fn open_root(root: &Path) -> Result<PathBuf, SnapError> {
    let canonical = root.canonicalize().map_err(|e| SnapError::root(root, e))?;
    if !canonical.is_dir() {
        return Err(SnapError::root(root, "not a directory"));
    }
    std::fs::read_dir(&canonical).map_err(|e| SnapError::root(root, e))?;
    Ok(canonical)
}

/// Counters for a finished (or running) walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files: u64,
    pub dirs: u64,
    pub warnings: u64,
}

/// A single pass over a directory tree.
///
/// Iterating yields [`Entry`] values; per-entry failures never end the
/// iteration. They are passed to the warning handler, logged, counted, and
/// the first [`MAX_RETAINED_WARNINGS`] are kept for inspection.
pub struct Walk<'a> {
    root: PathBuf,
    inner: Box<dyn Iterator<Item = RawEntry>>,
    on_warning: Option<Box<dyn FnMut(&WalkWarning) + 'a>>,
    warnings: Vec<WalkWarning>,
    warning_count: u64,
    tracker: ProgressTracker,
    progress_tx: broadcast::Sender<WalkProgress>,
    unreadable_dir: Option<PathBuf>,
    finished: bool,
}

impl Walk<'_> {
    /// Install a callback invoked for every per-entry failure.
    pub fn on_warning<'b>(self, handler: impl FnMut(&WalkWarning) + 'b) -> Walk<'b> {
        Walk {
            root: self.root,
            inner: self.inner,
            on_warning: Some(Box::new(handler)),
            warnings: self.warnings,
            warning_count: self.warning_count,
            tracker: self.tracker,
            progress_tx: self.progress_tx,
            unreadable_dir: self.unreadable_dir,
            finished: self.finished,
        }
    }

    /// The canonical root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Retained warnings, in the order they occurred.
    pub fn warnings(&self) -> &[WalkWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<WalkWarning> {
        self.warnings
    }

    pub fn stats(&self) -> WalkStats {
        let progress = self.tracker.snapshot(self.finished);
        WalkStats {
            files: progress.files_seen,
            dirs: progress.dirs_seen,
            warnings: self.warning_count,
        }
    }

    /// Record a failure that happened while consuming an entry, e.g. a file
    /// that vanished before it could be read.
    pub fn report(&mut self, warning: WalkWarning) {
        tracing::warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        self.tracker.record_warning();
        self.warning_count += 1;
        if let Some(handler) = self.on_warning.as_mut() {
            handler(&warning);
        }
        if self.warnings.len() < MAX_RETAINED_WARNINGS {
            self.warnings.push(warning);
        }
    }

    fn report_walk_error(&mut self, err: jwalk::Error) {
        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        let warning = match err.io_error() {
            Some(io) => WalkWarning::from_io(path, io),
            None => WalkWarning::new(path, err.to_string(), treesnap_core::WarningKind::ReadError),
        };
        self.report(warning);
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let progress = self.tracker.snapshot(true);
        tracing::debug!(
            root = %self.root.display(),
            files = progress.files_seen,
            dirs = progress.dirs_seen,
            warnings = progress.warnings,
            "walk finished"
        );
        let _ = self.progress_tx.send(progress);
    }
}

impl Iterator for Walk<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.finished {
            return None;
        }
        loop {
            let Some(raw) = self.inner.next() else {
                self.finish();
                return None;
            };

            let mut dir_entry = match raw {
                Ok(e) => e,
                Err(err) => {
                    if err.path().is_none() || err.path() != self.unreadable_dir.as_deref() {
                        self.report_walk_error(err);
                    }
                    continue;
                }
            };

            // An unreadable directory is still yielded; its listing error
            // rides along on the entry.
            if let Some(err) = dir_entry.read_children_error.take() {
                self.unreadable_dir = Some(dir_entry.path());
                self.report_walk_error(err);
            }

            let kind = EntryKind::from_file_type(dir_entry.file_type());
            let entry = Entry::new(&self.root, dir_entry.path(), dir_entry.depth(), kind);

            if kind.is_dir() {
                self.tracker.record_dir(&entry.path);
            } else {
                let count = self.tracker.record_file(&entry.path);
                if count % PROGRESS_INTERVAL == 0 {
                    let _ = self.progress_tx.send(self.tracker.snapshot(false));
                }
            }

            return Some(entry);
        }
    }
}

impl std::iter::FusedIterator for Walk<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::create_dir(root.join(".hidden")).unwrap();
        fs::create_dir(root.join("node_modules")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join(".dotfile"), "dot").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();
        fs::write(root.join(".hidden/secret.txt"), "nope").unwrap();
        fs::write(root.join("node_modules/pkg.js"), "nope").unwrap();

        temp
    }

    fn relative_paths(walk: Walk<'_>) -> Vec<String> {
        walk.map(|e| e.archive_name()).collect()
    }

    #[test]
    fn test_basic_walk() {
        let temp = create_test_tree();
        let mut tree_walk = walk(temp.path(), ExclusionSet::default()).unwrap();
        let entries: Vec<Entry> = tree_walk.by_ref().collect();

        let files = entries.iter().filter(|e| !e.is_dir()).count();
        assert_eq!(files, 5);
        assert_eq!(tree_walk.stats().files, 5);
        assert_eq!(tree_walk.stats().dirs, 3);
        assert_eq!(tree_walk.stats().warnings, 0);
    }

    #[test]
    fn test_pre_order_sorted() {
        let temp = create_test_tree();
        let paths = relative_paths(walk(temp.path(), ExclusionSet::default()).unwrap());

        assert_eq!(
            paths,
            vec![
                ".dotfile",
                "dir1",
                "dir1/file2.txt",
                "dir1/subdir",
                "dir1/subdir/file3.txt",
                "dir2",
                "dir2/file4.txt",
                "file1.txt",
            ]
        );
    }

    #[test]
    fn test_excluded_dirs_never_reported() {
        let temp = create_test_tree();
        let paths = relative_paths(walk(temp.path(), ExclusionSet::default()).unwrap());

        assert!(!paths.iter().any(|p| p.starts_with(".hidden")));
        assert!(!paths.iter().any(|p| p.starts_with("node_modules")));
        // Hidden files are still reported; only directories are pruned.
        assert!(paths.contains(&".dotfile".to_string()));
    }

    #[test]
    fn test_empty_exclusions_visit_everything() {
        let temp = create_test_tree();
        let paths = relative_paths(walk(temp.path(), ExclusionSet::empty()).unwrap());

        assert!(paths.contains(&".hidden/secret.txt".to_string()));
        assert!(paths.contains(&"node_modules/pkg.js".to_string()));
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = walk(temp.path().join("missing"), ExclusionSet::default());
        assert!(matches!(result, Err(SnapError::RootNotFound { .. })));
    }

    #[test]
    fn test_file_as_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let result = walk(&file, ExclusionSet::default());
        assert!(matches!(result, Err(SnapError::RootNotFound { .. })));
    }

    #[test]
    fn test_max_depth() {
        let temp = create_test_tree();
        let config = WalkConfig::builder()
            .root(temp.path())
            .max_depth(Some(1))
            .build()
            .unwrap();
        let paths = relative_paths(TreeWalker::new().walk(&config).unwrap());
        assert!(paths.contains(&"dir1".to_string()));
        assert!(!paths.contains(&"dir1/file2.txt".to_string()));
    }

    #[test]
    fn test_progress_final_snapshot() {
        let temp = create_test_tree();
        let walker = TreeWalker::new();
        let mut rx = walker.subscribe();

        let count = walker.walk(&WalkConfig::new(temp.path())).unwrap().count();
        assert_eq!(count, 8);

        let progress = rx.try_recv().unwrap();
        assert!(progress.finished);
        assert_eq!(progress.files_seen, 5);
    }

    #[test]
    fn test_warning_handler_sees_every_warning() {
        let temp = create_test_tree();
        let extra = MAX_RETAINED_WARNINGS + 5;
        let mut seen = Vec::new();

        {
            let mut tree_walk = walk(temp.path(), ExclusionSet::default())
                .unwrap()
                .on_warning(|w| seen.push(w.path.clone()));
            for i in 0..extra {
                tree_walk.report(WalkWarning::new(
                    temp.path().join(format!("gone-{i}")),
                    "vanished",
                    treesnap_core::WarningKind::NotFound,
                ));
            }
            assert_eq!(tree_walk.by_ref().count(), 8);

            let stats = tree_walk.stats();
            assert_eq!(stats.warnings, extra as u64);
            assert_eq!(stats.files, 5);
            assert_eq!(tree_walk.warnings().len(), MAX_RETAINED_WARNINGS);
            assert!(tree_walk.warnings()[0].path.ends_with("gone-0"));
        }

        assert_eq!(seen.len(), extra);
        assert!(seen[extra - 1].ends_with(format!("gone-{}", extra - 1)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_reported_once() {
        use std::os::unix::fs::PermissionsExt;

        let temp = create_test_tree();
        let locked = temp.path().join("dir2");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let readable = fs::read_dir(&locked).is_ok();

        let mut seen = 0;
        let count = walk(temp.path(), ExclusionSet::default())
            .unwrap()
            .on_warning(|_| seen += 1)
            .count();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if readable {
            // Privileged users list it anyway.
            assert_eq!((count, seen), (8, 0));
        } else {
            assert_eq!((count, seen), (7, 1));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_dir_not_followed() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("dir1"), temp.path().join("loop")).unwrap();

        let entries: Vec<Entry> = walk(temp.path(), ExclusionSet::default())
            .unwrap()
            .collect();
        let link = entries.iter().find(|e| e.archive_name() == "loop").unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert!(!entries.iter().any(|e| e.archive_name().starts_with("loop/")));
    }
}
