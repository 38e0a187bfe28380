//! Handing a finished artifact to a recipient.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use treesnap_core::{DeliveryError, OperationResult, OutboxSettings, SnapError};

use crate::artifact::temp_builder;
use crate::report::{DeliveryReceipt, OperationType, conclude};

/// Suffix of the sidecar file holding a caption.
pub const CAPTION_SUFFIX: &str = ".caption.txt";

/// Capability to transmit a named file plus an optional caption.
///
/// Implementations classify every failure into a [`DeliveryError`]; the
/// transport itself is up to them.
pub trait DeliveryChannel {
    fn send(
        &self,
        credential: &str,
        recipient: &str,
        file: &Path,
        caption: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Send `file` through `channel` and fold the outcome.
pub fn deliver(
    channel: &dyn DeliveryChannel,
    credential: &str,
    recipient: &str,
    file: impl AsRef<Path>,
    caption: &str,
) -> OperationResult {
    let result = channel
        .send(credential, recipient, file.as_ref(), caption)
        .map_err(SnapError::from);
    conclude(OperationType::Deliver, result)
}

/// Delivers into a local directory tree.
///
/// Each recipient is an existing subdirectory of `root`. A delivered file
/// keeps its name; a non-empty caption lands next to it as
/// `<name>.caption.txt`. Files are copied through a temporary file so a
/// recipient never sees a partial copy.
#[derive(Debug, Clone)]
pub struct OutboxChannel {
    root: PathBuf,
    credential: String,
}

impl OutboxChannel {
    pub fn new(root: impl Into<PathBuf>, credential: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            credential: credential.into(),
        }
    }

    pub fn from_settings(settings: &OutboxSettings) -> Self {
        Self::new(&settings.root, &settings.credential)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `recipient`, if it names a plain child of the root.
    fn recipient_dir(&self, recipient: &str) -> Option<PathBuf> {
        let mut components = Path::new(recipient).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !recipient.contains(['/', '\\']) => {
                let dir = self.root.join(name);
                dir.is_dir().then_some(dir)
            }
            _ => None,
        }
    }
}

impl DeliveryChannel for OutboxChannel {
    fn send(
        &self,
        credential: &str,
        recipient: &str,
        file: &Path,
        caption: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let not_found = || DeliveryError::FileNotFound {
            path: file.to_path_buf(),
        };
        let file_name = file.file_name().ok_or_else(not_found)?;
        if !file.is_file() {
            return Err(not_found());
        }

        if credential != self.credential {
            return Err(DeliveryError::InvalidCredential);
        }

        if !self.root.is_dir() {
            return Err(DeliveryError::Transport {
                message: format!("outbox {} is unreachable", self.root.display()),
            });
        }

        let dir = self
            .recipient_dir(recipient)
            .ok_or_else(|| DeliveryError::RecipientNotFound {
                recipient: recipient.to_string(),
            })?;

        let target = dir.join(file_name);
        let bytes = copy_atomic(file, &target).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if !file.exists() => not_found(),
            _ => transport(&target, e),
        })?;

        if !caption.is_empty() {
            let mut name = file_name.to_owned();
            name.push(CAPTION_SUFFIX);
            let caption_path = dir.join(name);
            fs::write(&caption_path, caption).map_err(|e| transport(&caption_path, e))?;
        }

        tracing::debug!(
            file = %file.display(),
            recipient,
            target = %target.display(),
            bytes,
            "delivered to outbox"
        );

        Ok(DeliveryReceipt {
            file: file.to_path_buf(),
            recipient: recipient.to_string(),
            location: Some(target),
            bytes,
        })
    }
}

fn transport(path: &Path, err: io::Error) -> DeliveryError {
    DeliveryError::Transport {
        message: format!("{}: {err}", path.display()),
    }
}

fn copy_atomic(from: &Path, to: &Path) -> io::Result<u64> {
    let parent = to.parent().unwrap_or(Path::new("."));
    let mut source = File::open(from)?;
    let mut temp = temp_builder().tempfile_in(parent)?;
    let bytes = io::copy(&mut source, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    temp.persist(to).map_err(|e| e.error)?;
    Ok(bytes)
}
