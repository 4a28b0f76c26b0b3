// src/config.rs
use crate::error::XProfileError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use xprofile_tree::TreeConfig;

/// Documents above this size get a warning before they are opened or imported.
pub const DEFAULT_LARGE_FILE_WARNING_BYTES: u64 = 5 * 1024 * 1024;

const MAX_INDENT: usize = 16;

/// Editor settings, usually read from a JSON file.
///
/// ```json
/// { "verbose": true, "indent": 4, "profilePath": "profiles.db" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Show full start tags in the tree instead of element names.
    pub verbose: bool,
    /// Spaces per nesting level in the text rendering.
    pub indent: usize,
    pub large_file_warning_bytes: u64,
    /// Profile database used when no other is given.
    pub profile_path: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            indent: 2,
            large_file_warning_bytes: DEFAULT_LARGE_FILE_WARNING_BYTES,
            profile_path: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, XProfileError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            XProfileError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read configuration from '{}': {}", path.display(), e),
            ))
        })?;
        let config = Self::from_json(&source)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), XProfileError> {
        if self.indent > MAX_INDENT {
            return Err(XProfileError::Config(format!(
                "indent must be at most {} (got {})",
                MAX_INDENT, self.indent
            )));
        }
        Ok(())
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            verbose: self.verbose,
            indent: self.indent,
        }
    }

    /// Logs a warning for input above the configured size. Returns whether it was large.
    pub fn warn_if_large(&self, what: &str, bytes: usize) -> bool {
        let large = bytes as u64 > self.large_file_warning_bytes;
        if large {
            log::warn!(
                "{} is {} bytes (warning threshold {}); this may take a while",
                what,
                bytes,
                self.large_file_warning_bytes
            );
        }
        large
    }
}
