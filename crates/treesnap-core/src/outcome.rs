//! Tagged outcome returned by every top-level operation.

use std::fmt;

use crate::error::SnapError;

/// Result of a top-level operation: `Success` with a human-readable message,
/// or `Failure` with the classified reason.
#[derive(Debug)]
#[must_use]
pub enum OperationResult {
    Success { message: String },
    Failure { reason: SnapError },
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn failure(reason: impl Into<SnapError>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The success message or the rendered failure reason.
    pub fn message(&self) -> String {
        match self {
            Self::Success { message } => message.clone(),
            Self::Failure { reason } => reason.to_string(),
        }
    }

    pub fn reason(&self) -> Option<&SnapError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn into_result(self) -> Result<String, SnapError> {
        match self {
            Self::Success { message } => Ok(message),
            Self::Failure { reason } => Err(reason),
        }
    }
}

impl From<Result<String, SnapError>> for OperationResult {
    fn from(result: Result<String, SnapError>) -> Self {
        match result {
            Ok(message) => Self::Success { message },
            Err(reason) => Self::Failure { reason },
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { message } => f.write_str(message),
            Self::Failure { reason } => write!(f, "Error: {reason}"),
        }
    }
}
