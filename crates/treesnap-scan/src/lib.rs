//! Directory walking for treesnap.
//!
//! This crate turns a root directory into a lazy, depth-first sequence of
//! [`Entry`] values using jwalk for traversal.
//!
//! # Overview
//!
//! - **Pre-order, sorted** output: a directory is yielded before its
//!   contents, siblings in name order
//! - **Pruning before descent** via an [`ExclusionSet`]
//! - **Failure tolerance**: unreadable or vanished entries become
//!   [`WalkWarning`]s and the walk goes on
//! - **Symlinks are never followed**
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use treesnap_scan::{TreeWalker, WalkConfig};
//!
//! let config = WalkConfig::new("/path/to/walk");
//! let walker = TreeWalker::new();
//! let walk = walker
//!     .walk(&config)
//!     .unwrap()
//!     .on_warning(|w| eprintln!("skipped: {w}"));
//!
//! for entry in walk {
//!     println!("{}", entry.path.display());
//! }
//! ```

mod progress;
mod walker;

pub use progress::WalkProgress;

/// Receiving half of a walker's progress channel.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<WalkProgress>;
pub use walker::{MAX_RETAINED_WARNINGS, TreeWalker, Walk, WalkStats, walk};

// Re-export core types for convenience
pub use treesnap_core::{
    Entry, EntryKind, ExclusionSet, SnapError, WalkConfig, WalkWarning, WarningKind,
};
