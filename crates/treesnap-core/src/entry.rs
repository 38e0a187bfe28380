//! Entries discovered during a walk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What kind of filesystem object an entry is.
///
/// Symlinks are never followed, so a link to a directory is still a
/// `Symlink` and is handled like a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

impl EntryKind {
    /// Classify a file type without following links.
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Files and symlinks are both treated as file entries.
    pub fn is_file_like(&self) -> bool {
        matches!(self, Self::File | Self::Symlink)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// A single discovered path. Entries live for one walk only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Full path, rooted at the walked root.
    pub path: PathBuf,
    /// Path relative to the walked root; empty for the root itself.
    pub relative: PathBuf,
    /// Depth below the root (root = 0).
    pub depth: usize,
    /// Entry kind.
    pub kind: EntryKind,
}

impl Entry {
    /// Create an entry, deriving the relative path from `root`.
    pub fn new(root: &Path, path: PathBuf, depth: usize, kind: EntryKind) -> Self {
        let relative = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        Self {
            path,
            relative,
            depth,
            kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Base name as a lossy string.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The relative path with `/` separators, as stored inside archives.
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let entry = Entry::new(
            Path::new("/data/root"),
            PathBuf::from("/data/root/sub/file.txt"),
            2,
            EntryKind::File,
        );
        assert_eq!(entry.relative, PathBuf::from("sub/file.txt"));
        assert_eq!(entry.archive_name(), "sub/file.txt");
        assert_eq!(entry.file_name(), "file.txt");
        assert!(!entry.is_dir());
    }

    #[test]
    fn test_root_entry_is_empty_relative() {
        let entry = Entry::new(
            Path::new("/data/root"),
            PathBuf::from("/data/root"),
            0,
            EntryKind::Directory,
        );
        assert_eq!(entry.relative, PathBuf::new());
        assert!(entry.is_dir());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(EntryKind::Symlink.is_file_like());
        assert!(EntryKind::File.is_file_like());
        assert!(!EntryKind::Directory.is_file_like());
        assert!(!EntryKind::Other.is_file_like());
    }
}
