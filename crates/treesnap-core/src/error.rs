//! Error types for walk, artifact and delivery operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a top-level operation.
///
/// Per-entry problems met during a walk are not errors; they are reported as
/// [`WalkWarning`]s and the walk continues.
#[derive(Debug, Error)]
pub enum SnapError {
    /// The scan root is missing, not a directory, or cannot be listed.
    #[error("Root not found: {path} ({reason})")]
    RootNotFound { path: PathBuf, reason: String },

    /// A single entry does not exist.
    #[error("Entry not found: {path}")]
    EntryNotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The destination artifact cannot be created or written.
    #[error("Cannot write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delivery channel rejected or failed to transmit an artifact.
    #[error(transparent)]
    Transport(#[from] DeliveryError),

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Anything else, with the underlying message preserved.
    #[error("{message}")]
    Unclassified { message: String },
}

impl SnapError {
    /// Classify an I/O error for an individual entry.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::EntryNotFound { path },
            _ => Self::Unclassified {
                message: format!("I/O error at {}: {source}", path.display()),
            },
        }
    }

    /// Any failure to open the scan root.
    pub fn root(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::RootNotFound {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Failure to create or write an artifact.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Create an unclassified error from any message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Unclassified {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RootNotFound { .. } => "root_not_found",
            Self::EntryNotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::WriteFailure { .. } => "write_failure",
            Self::Transport(_) => "transport_failure",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Unclassified { .. } => "unclassified",
        }
    }
}

/// Classified failures of a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The credential was rejected.
    #[error("Invalid credential: check the delivery token")]
    InvalidCredential,

    /// No recipient with this identifier.
    #[error("Recipient not found: {recipient}")]
    RecipientNotFound { recipient: String },

    /// The artifact to send does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Any other transport-level failure.
    #[error("Transport error: {message}")]
    Transport { message: String },
}

/// Kind of walk warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Entry vanished between listing and use.
    NotFound,
    /// Error reading file/directory.
    ReadError,
}

/// Non-fatal problem with a single entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl WalkWarning {
    /// Create a new walk warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Build a warning from an I/O error, classifying it by kind.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            std::io::ErrorKind::NotFound => WarningKind::NotFound,
            _ => WarningKind::ReadError,
        };
        Self {
            message: format!("{}: {error}", path.display()),
            path,
            kind,
        }
    }
}

impl std::fmt::Display for WalkWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
