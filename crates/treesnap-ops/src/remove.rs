//! Removal of files, symlinks and directory trees.

use std::fs;
use std::io;
use std::path::Path;

use treesnap_core::{OperationResult, SnapError};

use crate::report::{OperationType, RemoveReport, RemovedKind, conclude};

/// Remove `path` permanently.
pub fn remove(path: impl AsRef<Path>) -> OperationResult {
    conclude(OperationType::Remove, EntryRemover::new().remove(path.as_ref()))
}

/// Removes a single path: a file or symlink is unlinked, a directory is
/// removed together with everything below it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryRemover {
    /// Move to the platform trash instead of deleting.
    pub use_trash: bool,
}

impl EntryRemover {
    /// Create a remover that deletes permanently.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a remover that moves entries to the trash.
    pub fn with_trash() -> Self {
        Self { use_trash: true }
    }

    /// Remove `path`.
    ///
    /// A missing path yields [`SnapError::EntryNotFound`] and touches
    /// nothing. A symlink is removed itself; its target is left alone even
    /// when it is a directory.
    pub fn remove(&self, path: &Path) -> Result<RemoveReport, SnapError> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapError::EntryNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(SnapError::io(path, e)),
        };

        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            RemovedKind::Symlink
        } else if file_type.is_dir() {
            RemovedKind::Directory
        } else {
            RemovedKind::File
        };
        let bytes_freed = (kind == RemovedKind::File).then(|| metadata.len());

        if self.use_trash {
            trash::delete(path).map_err(|e| {
                SnapError::other(format!("Cannot move {} to trash: {e}", path.display()))
            })?;
        } else {
            let result = match kind {
                RemovedKind::Directory => fs::remove_dir_all(path),
                RemovedKind::File | RemovedKind::Symlink => remove_link_or_file(path),
            };
            result.map_err(|e| SnapError::io(path, e))?;
        }

        tracing::debug!(path = %path.display(), ?kind, trashed = self.use_trash, "removed");

        Ok(RemoveReport {
            path: path.to_path_buf(),
            kind,
            trashed: self.use_trash,
            bytes_freed,
        })
    }
}

#[cfg(not(windows))]
fn remove_link_or_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Directory symlinks on Windows must be removed as directories.
#[cfg(windows)]
fn remove_link_or_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_missing() {
        let temp = TempDir::new().unwrap();
        let result = EntryRemover::new().remove(&temp.path().join("ghost"));
        assert!(matches!(result, Err(SnapError::EntryNotFound { .. })));
    }

    #[test]
    fn test_remove_file_reports_size() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "12345").unwrap();

        let report = EntryRemover::new().remove(&file).unwrap();
        assert_eq!(report.kind, RemovedKind::File);
        assert_eq!(report.bytes_freed, Some(5));
        assert!(!file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_symlink_keeps_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("dir");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let report = EntryRemover::new().remove(&link).unwrap();
        assert_eq!(report.kind, RemovedKind::Symlink);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_broken_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), &link).unwrap();

        assert!(EntryRemover::new().remove(&link).is_ok());
        assert!(fs::symlink_metadata(&link).is_err());
    }
}
