//! On-disk settings (`config.toml`).
//!
//! ```toml
//! # Replace the built-in exclusion list (omit to keep the defaults).
//! exclusions = [".git", "node_modules"]
//! # Added on top of whichever list is active.
//! extra_exclusions = ["build"]
//! skip_hidden_dirs = true
//! threads = 1
//!
//! [outbox]
//! root = "/srv/treesnap/outbox"
//! credential = "s3cret"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ExclusionSet, WalkConfig};
use crate::error::SnapError;

/// File name looked up inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User settings, loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Full replacement for the default exclusion names.
    #[serde(default)]
    pub exclusions: Option<Vec<String>>,

    /// Names added to the active exclusion list.
    #[serde(default)]
    pub extra_exclusions: Vec<String>,

    /// Skip directories whose name starts with a dot.
    #[serde(default = "default_true")]
    pub skip_hidden_dirs: bool,

    /// Directory-reading threads (1 = serial).
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Maximum walk depth.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Local outbox used by the `send` command.
    #[serde(default)]
    pub outbox: Option<OutboxSettings>,
}

/// Settings for the local outbox delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutboxSettings {
    /// Directory holding one subdirectory per recipient.
    pub root: PathBuf,
    /// Credential callers must present.
    pub credential: String,
}

fn default_true() -> bool {
    true
}

fn default_threads() -> usize {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclusions: None,
            extra_exclusions: Vec::new(),
            skip_hidden_dirs: true,
            threads: 1,
            max_depth: None,
            outbox: None,
        }
    }
}

impl Settings {
    /// Default settings location: `<config_dir>/treesnap/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("treesnap").join(CONFIG_FILE_NAME))
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SnapError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Read and parse a specific settings file.
    pub fn from_file(path: &Path) -> Result<Self, SnapError> {
        let text = std::fs::read_to_string(path).map_err(|e| SnapError::InvalidConfig {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml(&text).map_err(|e| SnapError::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, SnapError> {
        let settings: Self = toml::from_str(text).map_err(|e| SnapError::InvalidConfig {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SnapError> {
        if self.max_depth == Some(0) {
            return Err(SnapError::InvalidConfig {
                message: "max_depth must be at least 1".to_string(),
            });
        }
        if let Some(outbox) = &self.outbox {
            if outbox.credential.is_empty() {
                return Err(SnapError::InvalidConfig {
                    message: "outbox.credential cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The exclusion set these settings describe.
    pub fn exclusion_set(&self) -> ExclusionSet {
        let mut set = match &self.exclusions {
            Some(names) => ExclusionSet::from_names(names.iter().cloned()),
            None => ExclusionSet::default(),
        };
        for name in &self.extra_exclusions {
            set.insert(name.clone());
        }
        set.with_hidden_skipped(self.skip_hidden_dirs)
    }

    /// A walk config for `root` using these settings.
    pub fn walk_config(&self, root: impl Into<PathBuf>) -> WalkConfig {
        WalkConfig {
            root: root.into(),
            exclusions: self.exclusion_set(),
            max_depth: self.max_depth,
            threads: self.threads,
        }
    }
}
