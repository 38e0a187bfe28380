//! Zip archiving of a directory tree.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use treesnap_core::{
    Entry, EntryKind, OperationResult, SnapError, WalkConfig, WalkWarning, WarningKind,
};
use treesnap_scan::{ProgressReceiver, TreeWalker, Walk};

use crate::artifact::ArtifactFile;
use crate::report::{ArchiveReport, OperationType, conclude};

/// Extension every archive carries.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Entries at or above this size are written with zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Append `.zip` unless the path already ends with it (any case).
///
/// `out` becomes `out.zip`, `out.tar` becomes `out.tar.zip`.
pub fn archive_path(destination: &Path) -> PathBuf {
    let has_extension = destination
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
    if has_extension {
        destination.to_path_buf()
    } else {
        let mut name = destination.as_os_str().to_owned();
        name.push(".");
        name.push(ARCHIVE_EXTENSION);
        PathBuf::from(name)
    }
}

/// Archive `root` into `destination` with the default exclusions.
pub fn archive(root: impl Into<PathBuf>, destination: impl AsRef<Path>) -> OperationResult {
    let archiver = Archiver::new(WalkConfig::new(root));
    conclude(OperationType::Archive, archiver.run(destination.as_ref()))
}

/// Writes one deflate-compressed zip container per run.
///
/// Regular files are stored under their root-relative path, always with
/// `/` separators. Symlinks are stored as zip symlink entries pointing at
/// their original target; their targets are never read. Directories
/// themselves get no entry.
pub struct Archiver {
    config: WalkConfig,
    walker: TreeWalker,
    compression_level: Option<i64>,
}

impl Archiver {
    pub fn new(config: WalkConfig) -> Self {
        Self {
            config,
            walker: TreeWalker::new(),
            compression_level: None,
        }
    }

    /// Deflate level 0-9; `None` uses the library default.
    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Subscribe to progress of the underlying walk.
    pub fn subscribe(&self) -> ProgressReceiver {
        self.walker.subscribe()
    }

    /// Produce the archive.
    ///
    /// Fails only if the root cannot be opened or the archive cannot be
    /// written. Entries that cannot be read are skipped and reported.
    pub fn run(&self, destination: &Path) -> Result<ArchiveReport, SnapError> {
        let destination = archive_path(destination);
        let mut walk = self.walker.walk(&self.config)?;
        let mut artifact = ArtifactFile::create(&destination)?;
        let mut report = ArchiveReport::new(walk.root().to_path_buf(), destination.clone());

        tracing::info!(
            root = %report.root.display(),
            destination = %destination.display(),
            "archiving"
        );

        let own_paths = artifact.own_paths().to_vec();
        let mut writer = ZipSink::new(&destination, artifact.file());
        while let Some(entry) = walk.next() {
            if own_paths.contains(&entry.path) {
                continue;
            }
            match entry.kind {
                EntryKind::Directory => {}
                EntryKind::File => match self.store_file(&mut writer, &entry)? {
                    Ok(bytes) => {
                        report.files_written += 1;
                        report.bytes_read += bytes;
                    }
                    Err(warning) => skip(&mut walk, &mut report, warning),
                },
                EntryKind::Symlink => match writer.add_symlink(&entry)? {
                    Ok(()) => report.symlinks_written += 1,
                    Err(warning) => skip(&mut walk, &mut report, warning),
                },
                EntryKind::Other => {
                    let warning = WalkWarning::new(
                        &entry.path,
                        format!("{}: special file not archived", entry.path.display()),
                        WarningKind::ReadError,
                    );
                    skip(&mut walk, &mut report, warning);
                }
            }
        }
        writer.finish()?;

        report.warnings = walk.into_warnings();
        report.destination = artifact.commit()?;
        Ok(report)
    }

    /// Store one regular file.
    ///
    /// The outer `Result` is a hard archive write failure; the inner one is a
    /// per-file read problem that only skips this file.
    fn store_file(
        &self,
        writer: &mut ZipSink<'_>,
        entry: &Entry,
    ) -> Result<Result<u64, WalkWarning>, SnapError> {
        let mut file = match File::open(&entry.path) {
            Ok(f) => f,
            Err(e) => return Ok(Err(WalkWarning::from_io(&entry.path, &e))),
        };
        let metadata = match file.metadata() {
            Ok(m) => m,
            Err(e) => return Ok(Err(WalkWarning::from_io(&entry.path, &e))),
        };

        let large_file = metadata.len() >= ZIP64_THRESHOLD;
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level)
            .large_file(large_file);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode());
        }

        writer.start_file(entry, options)?;

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    writer.abort_file()?;
                    return Ok(Err(WalkWarning::from_io(&entry.path, &e)));
                }
            };
            if outgrows_entry(large_file, total, n) {
                writer.abort_file()?;
                return Ok(Err(WalkWarning::new(
                    &entry.path,
                    format!("{}: file grew past 4 GiB while archiving", entry.path.display()),
                    WarningKind::ReadError,
                )));
            }
            writer.write_all(&buf[..n])?;
            total += n as u64;
        }

        tracing::debug!(path = %entry.path.display(), bytes = total, "stored");
        Ok(Ok(total))
    }
}

/// Whether appending `n` bytes pushes an entry opened without zip64
/// headers over the limit.
fn outgrows_entry(large_file: bool, written: u64, n: usize) -> bool {
    !large_file && written + n as u64 >= ZIP64_THRESHOLD
}

fn skip(walk: &mut Walk<'_>, report: &mut ArchiveReport, warning: WalkWarning) {
    report.skipped += 1;
    walk.report(warning);
}

/// Zip writer that maps every zip or I/O error into a
/// [`SnapError::WriteFailure`] for the archive being written.
struct ZipSink<'f> {
    destination: PathBuf,
    inner: ZipWriter<&'f mut File>,
}

impl<'f> ZipSink<'f> {
    fn new(destination: &Path, file: &'f mut File) -> Self {
        Self {
            destination: destination.to_path_buf(),
            inner: ZipWriter::new(file),
        }
    }

    fn start_file(&mut self, entry: &Entry, options: SimpleFileOptions) -> Result<(), SnapError> {
        self.inner
            .start_file(entry.archive_name(), options)
            .map_err(|e| zip_failure(&self.destination, e))
    }

    fn abort_file(&mut self) -> Result<(), SnapError> {
        self.inner
            .abort_file()
            .map_err(|e| zip_failure(&self.destination, e))
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), SnapError> {
        self.inner
            .write_all(buf)
            .map_err(|e| SnapError::write(&self.destination, e))
    }

    /// Store a symlink entry. Reading the link is a per-entry problem;
    /// writing the entry is not.
    fn add_symlink(&mut self, entry: &Entry) -> Result<Result<(), WalkWarning>, SnapError> {
        let target = match std::fs::read_link(&entry.path) {
            Ok(t) => t,
            Err(e) => return Ok(Err(WalkWarning::from_io(&entry.path, &e))),
        };
        self.inner
            .add_symlink(
                entry.archive_name(),
                target.to_string_lossy().into_owned(),
                SimpleFileOptions::default(),
            )
            .map_err(|e| zip_failure(&self.destination, e))?;
        Ok(Ok(()))
    }

    fn finish(self) -> Result<(), SnapError> {
        let Self { destination, inner } = self;
        inner
            .finish()
            .map(drop)
            .map_err(|e| zip_failure(&destination, e))
    }
}

fn zip_failure(destination: &Path, err: ZipError) -> SnapError {
    match err {
        ZipError::Io(e) => SnapError::write(destination, e),
        other => SnapError::write(destination, io::Error::other(other)),
    }
}
