//! Reports produced by completed operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use treesnap_core::{FilterSpec, OperationResult, SnapError, WalkWarning};

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Archive,
    Index,
    Remove,
    Deliver,
    Snapshot,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "Archive"),
            Self::Index => write!(f, "Index"),
            Self::Remove => write!(f, "Remove"),
            Self::Deliver => write!(f, "Deliver"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

/// Anything that can be turned into a one-line, human-readable summary.
pub trait Summary {
    fn summary(&self) -> String;
}

/// Log the outcome of an operation and fold it into an [`OperationResult`].
pub fn conclude<R: Summary>(operation: OperationType, result: Result<R, SnapError>) -> OperationResult {
    match result {
        Ok(report) => {
            let message = report.summary();
            tracing::info!(%operation, "{message}");
            OperationResult::success(message)
        }
        Err(reason) => {
            tracing::error!(%operation, code = reason.code(), "{reason}");
            OperationResult::failure(reason)
        }
    }
}

/// Result of a completed archive operation.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    /// Canonical root that was walked.
    pub root: PathBuf,
    /// Archive actually written, after extension normalization.
    pub destination: PathBuf,
    /// Regular files stored.
    pub files_written: u64,
    /// Symlinks stored as link entries.
    pub symlinks_written: u64,
    /// Bytes read from source files.
    pub bytes_read: u64,
    /// Entries skipped because they could not be read or stored.
    pub skipped: u64,
    /// Per-entry problems, capped at the walker's retention limit.
    pub warnings: Vec<WalkWarning>,
}

impl ArchiveReport {
    pub(crate) fn new(root: PathBuf, destination: PathBuf) -> Self {
        Self {
            root,
            destination,
            files_written: 0,
            symlinks_written: 0,
            bytes_read: 0,
            skipped: 0,
            warnings: Vec::new(),
        }
    }

    /// Entries stored in the archive.
    pub fn entries_written(&self) -> u64 {
        self.files_written + self.symlinks_written
    }
}

impl Summary for ArchiveReport {
    fn summary(&self) -> String {
        let mut message = format!(
            "Package created: {} ({} entries from '{}')",
            self.destination.display(),
            self.entries_written(),
            self.root.display()
        );
        if self.skipped > 0 {
            message.push_str(&format!(", {} skipped", self.skipped));
        }
        message
    }
}

/// Result of a completed index operation.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    /// Canonical root that was walked.
    pub root: PathBuf,
    /// Index file written.
    pub destination: PathBuf,
    /// Filter that was applied.
    pub filter: FilterSpec,
    /// Entries written to the index. Starts at zero, only ever grows.
    pub matched: u64,
    /// Non-directory entries examined.
    pub scanned: u64,
    /// Entries skipped because they could not be listed.
    pub skipped: u64,
    /// Per-entry problems, capped at the walker's retention limit.
    pub warnings: Vec<WalkWarning>,
}

impl Summary for IndexReport {
    fn summary(&self) -> String {
        let mut message = format!(
            "Index created: {} ({} matching entries of {} scanned under '{}')",
            self.destination.display(),
            self.matched,
            self.scanned,
            self.root.display()
        );
        if self.skipped > 0 {
            message.push_str(&format!(", {} skipped", self.skipped));
        }
        message
    }
}

/// What kind of object a removal deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovedKind {
    File,
    Symlink,
    Directory,
}

/// Result of a completed removal.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveReport {
    pub path: PathBuf,
    pub kind: RemovedKind,
    /// Whether the entry went to the trash instead of being deleted.
    pub trashed: bool,
    /// Size of a removed file; `None` for directories and links.
    pub bytes_freed: Option<u64>,
}

impl Summary for RemoveReport {
    fn summary(&self) -> String {
        let what = match self.kind {
            RemovedKind::Directory => "Directory",
            RemovedKind::File | RemovedKind::Symlink => "Entry",
        };
        if self.trashed {
            format!("{what} moved to trash: {}", self.path.display())
        } else {
            format!("{what} removed: {}", self.path.display())
        }
    }
}

/// Confirmation returned by a delivery channel.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    /// Artifact that was sent.
    pub file: PathBuf,
    /// Recipient identifier.
    pub recipient: String,
    /// Where the channel put the artifact, when it has a location.
    pub location: Option<PathBuf>,
    /// Bytes transmitted.
    pub bytes: u64,
}

impl Summary for DeliveryReceipt {
    fn summary(&self) -> String {
        format!("Dispatched: {} to {}", self.file.display(), self.recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_summary_mentions_skips() {
        let mut report = ArchiveReport::new("/src".into(), "/out.zip".into());
        report.files_written = 3;
        report.symlinks_written = 1;
        assert_eq!(
            report.summary(),
            "Package created: /out.zip (4 entries from '/src')"
        );

        report.skipped = 2;
        assert!(report.summary().ends_with(", 2 skipped"));
    }

    #[test]
    fn test_index_summary_reports_count() {
        let report = IndexReport {
            root: "/tmp/src".into(),
            destination: "/tmp/idx.log".into(),
            filter: FilterSpec::new([".log", ".cfg"]),
            matched: 2,
            scanned: 3,
            skipped: 0,
            warnings: Vec::new(),
        };
        assert!(report.summary().contains("(2 matching entries of 3 scanned"));
    }

    #[test]
    fn test_remove_summary() {
        let report = RemoveReport {
            path: "/tmp/x".into(),
            kind: RemovedKind::Directory,
            trashed: false,
            bytes_freed: None,
        };
        assert_eq!(report.summary(), "Directory removed: /tmp/x");
    }

    #[test]
    fn test_conclude() {
        let ok = conclude(
            OperationType::Deliver,
            Ok::<_, SnapError>(DeliveryReceipt {
                file: "/a.zip".into(),
                recipient: "ops".into(),
                location: None,
                bytes: 10,
            }),
        );
        assert_eq!(ok.message(), "Dispatched: /a.zip to ops");

        let err = conclude::<DeliveryReceipt>(
            OperationType::Deliver,
            Err(SnapError::other("boom")),
        );
        assert!(!err.is_success());
    }
}
