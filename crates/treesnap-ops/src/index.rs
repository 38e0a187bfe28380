//! Newline-delimited catalog of the files under a root.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use treesnap_core::{FilterSpec, OperationResult, SnapError, WalkConfig, WalkWarning, WarningKind};
use treesnap_scan::{ProgressReceiver, TreeWalker};

use crate::artifact::ArtifactFile;
use crate::report::{IndexReport, OperationType, conclude};

/// Header lines written before the first path.
pub const HEADER_LINES: usize = 3;

/// Index `root` into `destination`, keeping names that match `filter`.
pub fn index(
    root: impl Into<PathBuf>,
    filter: Option<FilterSpec>,
    destination: impl AsRef<Path>,
) -> OperationResult {
    let indexer = Indexer::new(WalkConfig::new(root), filter.unwrap_or_default());
    conclude(OperationType::Index, indexer.run(destination.as_ref()))
}

/// Writes an index file:
///
/// ```text
/// # System Resource Index - Scan Root: /srv/data
/// # Filter: ['.log', '.cfg']
/// # ---
/// /srv/data/app.log
/// /srv/data/etc/app.cfg
/// ```
///
/// Every non-directory entry whose base name matches the filter is listed
/// as a full path, in walk order.
pub struct Indexer {
    config: WalkConfig,
    filter: FilterSpec,
    walker: TreeWalker,
}

impl Indexer {
    pub fn new(config: WalkConfig, filter: FilterSpec) -> Self {
        Self {
            config,
            filter,
            walker: TreeWalker::new(),
        }
    }

    pub fn subscribe(&self) -> ProgressReceiver {
        self.walker.subscribe()
    }

    pub fn run(&self, destination: &Path) -> Result<IndexReport, SnapError> {
        let mut walk = self.walker.walk(&self.config)?;
        let mut artifact = ArtifactFile::create(destination)?;
        let own_paths = artifact.own_paths().to_vec();
        let root = walk.root().to_path_buf();

        tracing::info!(
            root = %root.display(),
            filter = %self.filter,
            destination = %destination.display(),
            "indexing"
        );

        let write_err = |e| SnapError::write(destination, e);
        let mut out = BufWriter::new(artifact.file());
        writeln!(out, "# System Resource Index - Scan Root: {}", root.display()).map_err(write_err)?;
        writeln!(out, "# Filter: {}", self.filter).map_err(write_err)?;
        writeln!(out, "# ---").map_err(write_err)?;

        let mut matched = 0u64;
        let mut scanned = 0u64;
        let mut skipped = 0u64;
        while let Some(entry) = walk.next() {
            if entry.is_dir() || own_paths.contains(&entry.path) {
                continue;
            }
            scanned += 1;
            if !self.filter.matches(&entry.file_name()) {
                continue;
            }

            let Some(line) = entry.path.to_str() else {
                skipped += 1;
                walk.report(WalkWarning::new(
                    &entry.path,
                    format!("{}: name is not valid UTF-8, not indexed", entry.path.display()),
                    WarningKind::ReadError,
                ));
                continue;
            };
            if line.contains(['\n', '\r']) {
                // A line break in a name would forge extra index lines.
                skipped += 1;
                walk.report(WalkWarning::new(
                    &entry.path,
                    format!("{line:?}: name contains a line break, not indexed"),
                    WarningKind::ReadError,
                ));
                continue;
            }

            writeln!(out, "{line}").map_err(write_err)?;
            matched += 1;
        }

        out.flush().map_err(write_err)?;
        drop(out);

        let destination = artifact.commit()?;
        Ok(IndexReport {
            root,
            destination,
            filter: self.filter.clone(),
            matched,
            scanned,
            skipped,
            warnings: walk.into_warnings(),
        })
    }
}
