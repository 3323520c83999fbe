//! Package metadata (`package.json` at the project root).

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{ConfigError, CoreError, Result};

static VERSION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((0|[1-9][0-9]{0,8})([.](0|[1-9][0-9]{0,8})){0,3})")
        .expect("valid version regex")
});

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackage {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    short_name: Option<String>,
}

/// Fields of `package.json` the manifest is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub description: String,
    /// Version exactly as declared
    pub version: String,
    pub short_name: Option<String>,
}

impl PackageMetadata {
    /// Read `<root>/package.json`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::PackageNotFound`] if the file is missing and
    /// [`ConfigError::MissingPackageField`] if version, name or description
    /// is absent.
    pub async fn read(root: &Path) -> Result<Self> {
        let path = root.join("package.json");
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::PackageNotFound(path).into());
            }
            Err(err) => return Err(CoreError::io(path, err)),
        };
        Self::parse(&text)
    }

    /// Parse the contents of a `package.json`.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawPackage = serde_json::from_str(text)?;
        let version = raw
            .version
            .ok_or(ConfigError::MissingPackageField { field: "version" })?;
        let name = raw
            .name
            .ok_or(ConfigError::MissingPackageField { field: "name" })?;
        let description = raw
            .description
            .ok_or(ConfigError::MissingPackageField {
                field: "description",
            })?;

        Ok(Self {
            name,
            description,
            version,
            short_name: raw.short_name,
        })
    }

    /// Browser-compatible version, see [`simplify_version`].
    pub fn simple_version(&self) -> Result<String> {
        simplify_version(&self.version)
    }
}

/// Longest prefix of `version` made of one to four dot separated numbers.
///
/// Browsers reject pre-release suffixes, so `1.2.3-beta1` becomes `1.2.3`.
///
/// # Errors
///
/// [`ConfigError::InvalidVersion`] when there is no numeric prefix.
pub fn simplify_version(version: &str) -> Result<String> {
    VERSION_PREFIX
        .captures(version)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            ConfigError::InvalidVersion {
                version: version.to_string(),
            }
            .into()
        })
}
