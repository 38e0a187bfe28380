//! Walk configuration types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Directory names never descended into by default.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "target",
    ".venv",
    "venv",
    ".cache",
];

/// Directory basenames the walker must not descend into.
///
/// Matching is exact on the basename. When `skip_hidden` is set, any
/// directory whose name starts with `.` is excluded as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
    #[serde(default = "default_true")]
    skip_hidden: bool,
}

impl ExclusionSet {
    /// An exclusion set that excludes nothing, hidden directories included.
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
            skip_hidden: false,
        }
    }

    /// Build a set from explicit names, skipping hidden directories.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            skip_hidden: true,
        }
    }

    /// Add a directory name to the set.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    /// Toggle the hidden-directory rule.
    pub fn with_hidden_skipped(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Whether hidden directories are skipped.
    pub fn skips_hidden(&self) -> bool {
        self.skip_hidden
    }

    /// Whether a directory with this basename must not be entered.
    pub fn excludes(&self, name: &str) -> bool {
        (self.skip_hidden && name.starts_with('.')) || self.names.contains(name)
    }

    /// Iterate over the explicit names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::from_names(DEFAULT_EXCLUSIONS.iter().copied())
    }
}

fn default_true() -> bool {
    true
}

/// Configuration for a single walk.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WalkConfig {
    /// Root directory to walk.
    pub root: PathBuf,

    /// Directory names to prune before descent.
    #[builder(default)]
    #[serde(default)]
    pub exclusions: ExclusionSet,

    /// Maximum depth to traverse (None = unlimited). The root is depth 0.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Directory-reading threads: 1 = serial, 0 = rayon default pool.
    #[builder(default = "1")]
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_threads() -> usize {
    1
}

impl WalkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if self.max_depth == Some(Some(0)) {
            return Err("max_depth must be at least 1".to_string());
        }
        Ok(())
    }
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Create a config for walking a path with the default exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclusions: ExclusionSet::default(),
            max_depth: None,
            threads: 1,
        }
    }

    /// Replace the exclusion set.
    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exclusions() {
        let set = ExclusionSet::default();
        assert!(set.excludes(".git"));
        assert!(set.excludes("node_modules"));
        assert!(set.excludes(".anything_hidden"));
        assert!(!set.excludes("src"));
        assert!(!set.excludes("node_modules_backup"));
    }

    #[test]
    fn test_empty_exclusions() {
        let set = ExclusionSet::empty();
        assert!(!set.excludes(".git"));
        assert!(!set.excludes("target"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_hidden_toggle() {
        let set = ExclusionSet::from_names(["build"]).with_hidden_skipped(false);
        assert!(!set.excludes(".config"));
        assert!(set.excludes("build"));
    }

    #[test]
    fn test_config_builder() {
        let config = WalkConfig::builder()
            .root("/home/user")
            .threads(4usize)
            .max_depth(Some(3))
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.threads, 4);
        assert_eq!(config.max_depth, Some(3));
        assert_eq!(config.exclusions, ExclusionSet::default());
    }

    #[test]
    fn test_config_builder_rejects_empty_root() {
        assert!(WalkConfig::builder().root("").build().is_err());
        assert!(WalkConfig::builder().build().is_err());
    }

    #[test]
    fn test_config_simple() {
        let config = WalkConfig::new("/home/user");
        assert_eq!(config.threads, 1);
        assert!(config.max_depth.is_none());
    }
}
