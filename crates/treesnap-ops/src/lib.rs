//! Operations that turn a walked tree into artifacts.
//!
//! Every top-level operation has a free function returning an
//! [`OperationResult`] and a type exposing a typed report:
//!
//! - [`archive`] / [`Archiver`]: zip archive of the tree
//! - [`index`] / [`Indexer`]: newline-delimited catalog of matching names
//! - [`remove`] / [`EntryRemover`]: delete a file or a whole tree
//! - [`deliver`] / [`DeliveryChannel`]: hand an artifact to a recipient
//! - [`Snapshot`]: the above chained into one pipeline

mod archive;
mod artifact;
mod deliver;
mod index;
mod remove;
mod report;
mod snapshot;

pub use archive::{ARCHIVE_EXTENSION, Archiver, archive, archive_path};
pub use deliver::{CAPTION_SUFFIX, DeliveryChannel, OutboxChannel, deliver};
pub use index::{HEADER_LINES, Indexer, index};
pub use remove::{EntryRemover, remove};
pub use report::{
    ArchiveReport, DeliveryReceipt, IndexReport, OperationType, RemoveReport, RemovedKind,
    Summary, conclude,
};
pub use snapshot::{ArtifactKind, ArtifactReport, Delivery, Snapshot, SnapshotReport};

pub use treesnap_core::OperationResult;
