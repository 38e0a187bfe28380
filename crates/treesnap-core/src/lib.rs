//! Core types and configuration for treesnap.
//!
//! This crate provides the data model shared by the walker and the
//! operations: walk configuration and exclusion sets, suffix filters,
//! discovered entries, the error taxonomy and the tagged operation result.

mod config;
mod entry;
mod error;
pub mod filter;
mod outcome;
mod settings;

pub use config::{DEFAULT_EXCLUSIONS, ExclusionSet, WalkConfig, WalkConfigBuilder};
pub use entry::{Entry, EntryKind};
pub use error::{DeliveryError, SnapError, WalkWarning, WarningKind};
pub use filter::FilterSpec;
pub use outcome::OperationResult;
pub use settings::{CONFIG_FILE_NAME, OutboxSettings, Settings};
