//! Per-browser `include` / `exclude` filtering of entrypoints.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Browser;
use crate::error::ConfigError;

/// Per-browser inclusion rule declared by an entrypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl BrowserFilter {
    /// Whether the entrypoint is built for `browser`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConflictingFilter`] when both lists are set, naming
    /// `entrypoint` (relative to the project root).
    pub fn is_active(&self, browser: &Browser, entrypoint: &Path) -> Result<bool, ConfigError> {
        match (&self.include, &self.exclude) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingFilter {
                entrypoint: entrypoint.to_path_buf(),
            }),
            (Some(include), None) => Ok(include.iter().any(|b| b == browser.as_str())),
            (None, Some(exclude)) => Ok(!exclude.iter().any(|b| b == browser.as_str())),
            (None, None) => Ok(true),
        }
    }
}
