//! Artifact files written through a temporary file and renamed on success.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use treesnap_core::SnapError;

/// An artifact under construction.
///
/// Content goes to a hidden temporary file next to the destination. Only
/// [`commit`](Self::commit) moves it into place; dropping the value
/// discards the partial file, so a failed operation never leaves a
/// truncated artifact at the destination.
pub(crate) struct ArtifactFile {
    destination: PathBuf,
    temp: NamedTempFile,
    own_paths: Vec<PathBuf>,
}

impl ArtifactFile {
    pub fn create(destination: &Path) -> Result<Self, SnapError> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp = temp_builder()
            .tempfile_in(parent)
            .map_err(|e| SnapError::write(destination, e))?;

        let mut own_paths: Vec<PathBuf> = temp.path().canonicalize().ok().into_iter().collect();
        if let (Ok(dir), Some(name)) = (parent.canonicalize(), destination.file_name()) {
            own_paths.push(dir.join(name));
        }

        Ok(Self {
            destination: destination.to_path_buf(),
            temp,
            own_paths,
        })
    }

    /// Canonical paths of the temporary file and of the final destination.
    ///
    /// A destination inside the walked root would otherwise be picked up by
    /// the walk producing it, or by the next run over the same root, so
    /// callers skip these paths.
    pub fn own_paths(&self) -> &[PathBuf] {
        &self.own_paths
    }

    pub fn file(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Flush to disk and atomically move the artifact into place.
    pub fn commit(self) -> Result<PathBuf, SnapError> {
        self.temp
            .as_file()
            .sync_all()
            .map_err(|e| SnapError::write(&self.destination, e))?;
        self.temp
            .persist(&self.destination)
            .map_err(|e| SnapError::write(&self.destination, e.error))?;
        Ok(self.destination)
    }
}

/// Builder for hidden `.part` files that end up with the same mode a
/// plain `File::create` would give them under the current umask.
pub(crate) fn temp_builder() -> tempfile::Builder<'static, 'static> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".treesnap-").suffix(".part");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder
}
