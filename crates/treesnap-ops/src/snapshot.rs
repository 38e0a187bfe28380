//! The snapshot pipeline: produce an artifact, hand it off, clean up.

use std::fs;
use std::path::Path;

use serde::Serialize;

use treesnap_core::{FilterSpec, OperationResult, SnapError, WalkConfig};

use crate::archive::Archiver;
use crate::deliver::DeliveryChannel;
use crate::index::Indexer;
use crate::remove::EntryRemover;
use crate::report::{
    ArchiveReport, DeliveryReceipt, IndexReport, OperationType, RemoveReport, Summary, conclude,
};

/// Which artifact a snapshot produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Zip archive of the tree.
    Archive,
    /// Index of the names matching `filter`.
    Index { filter: FilterSpec },
}

/// Where and how to send the artifact.
pub struct Delivery {
    pub channel: Box<dyn DeliveryChannel>,
    pub credential: String,
    pub recipient: String,
    pub caption: String,
}

impl Delivery {
    pub fn new(
        channel: impl DeliveryChannel + 'static,
        credential: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            channel: Box::new(channel),
            credential: credential.into(),
            recipient: recipient.into(),
            caption: String::new(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("recipient", &self.recipient)
            .field("caption", &self.caption)
            .finish_non_exhaustive()
    }
}

/// The artifact a snapshot produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactReport {
    Archive(ArchiveReport),
    Index(IndexReport),
}

impl ArtifactReport {
    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(r) => &r.destination,
            Self::Index(r) => &r.destination,
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Self::Archive(r) => &r.root,
            Self::Index(r) => &r.root,
        }
    }
}

impl Summary for ArtifactReport {
    fn summary(&self) -> String {
        match self {
            Self::Archive(r) => r.summary(),
            Self::Index(r) => r.summary(),
        }
    }
}

/// Everything a completed snapshot did, in order.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub artifact: ArtifactReport,
    pub delivery: Option<DeliveryReceipt>,
    pub removed: Vec<RemoveReport>,
}

impl Summary for SnapshotReport {
    fn summary(&self) -> String {
        let mut parts = vec![self.artifact.summary()];
        parts.extend(self.delivery.iter().map(|d| d.summary()));
        parts.extend(self.removed.iter().map(|r| r.summary()));
        parts.join("; ")
    }
}

/// Archive or index a root, optionally deliver the artifact, then
/// optionally remove the artifact and the source.
///
/// Steps run strictly in order and the first failing step ends the run.
/// Nothing is removed unless the delivery (when requested) succeeded.
#[derive(Debug)]
pub struct Snapshot {
    config: WalkConfig,
    kind: ArtifactKind,
    delivery: Option<Delivery>,
    remove_artifact: bool,
    remove_source: bool,
    remover: EntryRemover,
}

impl Snapshot {
    pub fn new(config: WalkConfig, kind: ArtifactKind) -> Self {
        Self {
            config,
            kind,
            delivery: None,
            remove_artifact: false,
            remove_source: false,
            remover: EntryRemover::new(),
        }
    }

    pub fn deliver_to(mut self, delivery: Delivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn remove_artifact(mut self, yes: bool) -> Self {
        self.remove_artifact = yes;
        self
    }

    pub fn remove_source(mut self, yes: bool) -> Self {
        self.remove_source = yes;
        self
    }

    pub fn use_trash(mut self, yes: bool) -> Self {
        self.remover.use_trash = yes;
        self
    }

    /// Run the pipeline and fold the outcome.
    pub fn execute(&self, destination: impl AsRef<Path>) -> OperationResult {
        conclude(OperationType::Snapshot, self.run(destination.as_ref()))
    }

    pub fn run(&self, destination: &Path) -> Result<SnapshotReport, SnapError> {
        let artifact = match &self.kind {
            ArtifactKind::Archive => {
                ArtifactReport::Archive(Archiver::new(self.config.clone()).run(destination)?)
            }
            ArtifactKind::Index { filter } => ArtifactReport::Index(
                Indexer::new(self.config.clone(), filter.clone()).run(destination)?,
            ),
        };
        let artifact_path = artifact.path().to_path_buf();
        tracing::info!(artifact = %artifact_path.display(), "snapshot artifact ready");

        let source = self.config.root.as_path();
        if self.remove_source && !self.remove_artifact && removal_takes(source, &artifact_path) {
            return Err(SnapError::InvalidConfig {
                message: format!(
                    "artifact {} lies inside the source that would be removed",
                    artifact_path.display()
                ),
            });
        }

        let delivery = match &self.delivery {
            Some(d) => Some(
                d.channel
                    .send(&d.credential, &d.recipient, &artifact_path, &d.caption)
                    .map_err(SnapError::from)?,
            ),
            None => None,
        };

        let mut removed = Vec::new();
        if self.remove_artifact {
            removed.push(self.remover.remove(&artifact_path)?);
        }
        if self.remove_source {
            // The path as given: a symlinked source is unlinked, not emptied.
            removed.push(self.remover.remove(source)?);
        }

        Ok(SnapshotReport {
            artifact,
            delivery,
            removed,
        })
    }
}

/// Whether removing `source` would also delete `artifact`.
fn removal_takes(source: &Path, artifact: &Path) -> bool {
    match fs::symlink_metadata(source) {
        Ok(meta) if meta.file_type().is_dir() => {}
        _ => return false,
    }
    match (source.canonicalize(), artifact.canonicalize()) {
        (Ok(source), Ok(artifact)) => artifact.starts_with(source),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::OutboxChannel;
    use crate::report::RemovedKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tree(temp: &TempDir) -> PathBuf {
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.log"), "a").unwrap();
        fs::write(src.join("sub/b.txt"), "b").unwrap();
        src
    }

    fn outbox(temp: &TempDir) -> OutboxChannel {
        let root = temp.path().join("outbox");
        fs::create_dir_all(root.join("ops")).unwrap();
        OutboxChannel::new(root, "token")
    }

    #[test]
    fn test_archive_only() {
        let temp = TempDir::new().unwrap();
        let src = tree(&temp);

        let report = Snapshot::new(WalkConfig::new(&src), ArtifactKind::Archive)
            .run(&temp.path().join("snap"))
            .unwrap();

        assert_eq!(report.artifact.path(), temp.path().join("snap.zip"));
        assert!(report.delivery.is_none());
        assert!(report.removed.is_empty());
        assert!(src.exists());
    }

    #[test]
    fn test_deliver_then_cleanup() {
        let temp = TempDir::new().unwrap();
        let src = tree(&temp);
        let channel = outbox(&temp);
        let delivered = channel.root().join("ops/snap.zip");

        let report = Snapshot::new(WalkConfig::new(&src), ArtifactKind::Archive)
            .deliver_to(Delivery::new(channel, "token", "ops").with_caption("nightly"))
            .remove_artifact(true)
            .remove_source(true)
            .run(&temp.path().join("snap.zip"))
            .unwrap();

        assert!(delivered.exists());
        assert!(!temp.path().join("snap.zip").exists());
        assert!(!src.exists());
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.removed[1].kind, RemovedKind::Directory);
        assert!(report.summary().contains("Dispatched: "));
    }

    #[test]
    fn test_failed_delivery_skips_cleanup() {
        let temp = TempDir::new().unwrap();
        let src = tree(&temp);

        let result = Snapshot::new(
            WalkConfig::new(&src),
            ArtifactKind::Index {
                filter: FilterSpec::new([".log"]),
            },
        )
        .deliver_to(Delivery::new(outbox(&temp), "wrong", "ops"))
        .remove_artifact(true)
        .remove_source(true)
        .run(&temp.path().join("index.txt"));

        assert!(matches!(result, Err(SnapError::Transport(_))));
        assert!(temp.path().join("index.txt").exists());
        assert!(src.join("a.log").exists());
    }

    #[test]
    fn test_artifact_inside_removed_source_rejected() {
        let temp = TempDir::new().unwrap();
        let src = tree(&temp);

        let result = Snapshot::new(WalkConfig::new(&src), ArtifactKind::Archive)
            .remove_source(true)
            .run(&src.join("self.zip"));

        assert!(matches!(result, Err(SnapError::InvalidConfig { .. })));
        assert!(src.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_source_is_unlinked_not_emptied() {
        let temp = TempDir::new().unwrap();
        let real = tree(&temp);
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let report = Snapshot::new(WalkConfig::new(&link), ArtifactKind::Archive)
            .remove_source(true)
            .run(&temp.path().join("out"))
            .unwrap();

        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].path, link);
        assert_eq!(report.removed[0].kind, RemovedKind::Symlink);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(real.join("a.log").exists());
        assert!(real.join("sub/b.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_in_symlink_target_survives_unlink() {
        let temp = TempDir::new().unwrap();
        let real = tree(&temp);
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let report = Snapshot::new(WalkConfig::new(&link), ArtifactKind::Archive)
            .remove_source(true)
            .run(&real.join("self.zip"))
            .unwrap();

        assert_eq!(report.removed[0].kind, RemovedKind::Symlink);
        assert!(real.join("self.zip").exists());
    }

    #[test]
    fn test_missing_root_fails_first_step() {
        let temp = TempDir::new().unwrap();
        let outcome = Snapshot::new(WalkConfig::new(temp.path().join("nope")), ArtifactKind::Archive)
            .execute(temp.path().join("out"));
        assert_eq!(outcome.reason().map(SnapError::code), Some("root_not_found"));
        assert!(!temp.path().join("out.zip").exists());
    }
}
