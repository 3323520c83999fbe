//! Pipeline configuration.
//!
//! [`UserConfig`] is what a project declares (config file, environment, CLI
//! flags, merged by the caller). [`ResolvedConfig`] is the immutable value the
//! pipeline runs with: every path absolute, every default applied. It is
//! built once per pipeline and shared by reference with each stage.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Target browser identifier (`chrome`, `firefox`, `edge`, `safari`, ...).
///
/// Browsers are an open set; only Firefox gets special treatment when
/// assembling the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Browser(String);

impl Browser {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_firefox(&self) -> bool {
        self.0 == "firefox"
    }

    /// Firefox and Safari default to MV2, everything else to MV3.
    pub fn default_manifest_version(&self) -> ManifestVersion {
        match self.0.as_str() {
            "firefox" | "safari" => ManifestVersion::V2,
            _ => ManifestVersion::V3,
        }
    }
}

impl Default for Browser {
    fn default() -> Self {
        Self::new("chrome")
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manifest schema version, serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ManifestVersion {
    V2,
    V3,
}

impl ManifestVersion {
    pub fn number(self) -> u8 {
        match self {
            ManifestVersion::V2 => 2,
            ManifestVersion::V3 => 3,
        }
    }
}

impl TryFrom<u8> for ManifestVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            2 => Ok(ManifestVersion::V2),
            3 => Ok(ManifestVersion::V3),
            other => Err(format!("manifest version must be 2 or 3, got {other}")),
        }
    }
}

impl From<ManifestVersion> for u8 {
    fn from(value: ManifestVersion) -> Self {
        value.number()
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Which command the pipeline runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// One-shot production build
    Build,
    /// Development mode with a running dev server
    Serve,
}

/// Address of the running dev server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerInfo {
    pub hostname: String,
    pub port: u16,
}

impl DevServerInfo {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Ex: `http://localhost:3000`
    pub fn origin(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }

    /// Match pattern granting the extension access to the server.
    /// Match patterns cannot carry a port.
    pub fn host_permission(&self) -> String {
        format!("http://{}/*", self.hostname)
    }
}

/// Dev server settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// An external program the pipeline talks to over JSON stdio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCommand {
    /// Program followed by its arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl ExternalCommand {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}

/// Project configuration as declared by the user.
///
/// Relative directories are resolved against the project root (or `srcDir`
/// for the entrypoints and public directories).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserConfig {
    /// Directory holding all source code (default: project root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_dir: Option<PathBuf>,

    /// Entrypoints directory (default: `<srcDir>/entrypoints`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoints_dir: Option<PathBuf>,

    /// Files copied verbatim to the output (default: `<srcDir>/public`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_dir: Option<PathBuf>,

    /// Base output directory (default: `.output`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    /// Target browser (default: `chrome`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Target manifest version (default depends on the browser)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_version: Option<ManifestVersion>,

    /// Build mode (default: `production` for build, `development` for serve)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Manifest fields merged over the generated manifest
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub manifest: Map<String, Value>,

    /// Only build entrypoints with these names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_entrypoints: Vec<String>,

    #[serde(default)]
    pub dev: DevOptions,

    /// Bundler bridge command; the copy bundler is used when unset
    #[serde(default)]
    pub bundler: ExternalCommand,

    /// Definition loader command for script entrypoints
    #[serde(default)]
    pub loader: ExternalCommand,
}

/// Fully resolved, immutable configuration for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub root: PathBuf,
    pub src_dir: PathBuf,
    pub entrypoints_dir: PathBuf,
    pub public_dir: PathBuf,
    pub out_base_dir: PathBuf,
    /// `<out_base_dir>/<browser>-mv<N>`
    pub out_dir: PathBuf,
    pub browser: Browser,
    pub manifest_version: ManifestVersion,
    pub mode: String,
    pub command: Command,
    pub manifest: Map<String, Value>,
    pub filter_entrypoints: Option<BTreeSet<String>>,
    pub server: Option<DevServerInfo>,
}

impl ResolvedConfig {
    /// Apply defaults and resolve every path against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty browser or mode.
    pub fn resolve(
        root: impl AsRef<Path>,
        user: &UserConfig,
        command: Command,
        server: Option<DevServerInfo>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let browser = Browser::new(user.browser.clone().unwrap_or_else(|| "chrome".into()));
        if browser.as_str().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "browser".into(),
                value: String::new(),
                hint: "Set a browser name such as \"chrome\" or \"firefox\"".into(),
            }
            .into());
        }
        let manifest_version = user
            .manifest_version
            .unwrap_or_else(|| browser.default_manifest_version());

        let mode = user.mode.clone().unwrap_or_else(|| match command {
            Command::Build => "production".into(),
            Command::Serve => "development".into(),
        });
        if mode.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mode".into(),
                value: String::new(),
                hint: "Mode cannot be empty".into(),
            }
            .into());
        }

        let src_dir = resolve_dir(&root, user.src_dir.as_deref(), "");
        let entrypoints_dir =
            resolve_dir(&src_dir, user.entrypoints_dir.as_deref(), "entrypoints");
        let public_dir = resolve_dir(&src_dir, user.public_dir.as_deref(), "public");
        let out_base_dir = resolve_dir(&root, user.out_dir.as_deref(), ".output");
        let out_dir = out_base_dir.join(format!("{browser}-mv{manifest_version}"));

        let filter_entrypoints = if user.filter_entrypoints.is_empty() {
            None
        } else {
            Some(user.filter_entrypoints.iter().cloned().collect())
        };

        Ok(Self {
            root,
            src_dir,
            entrypoints_dir,
            public_dir,
            out_base_dir,
            out_dir,
            browser,
            manifest_version,
            mode,
            command,
            manifest: user.manifest.clone(),
            filter_entrypoints,
            server,
        })
    }

    pub fn is_dev(&self) -> bool {
        self.command == Command::Serve
    }

    pub fn is_production(&self) -> bool {
        self.mode == "production"
    }

    /// `chrome-mv3`, `firefox-mv2`, ...
    pub fn target(&self) -> String {
        format!("{}-mv{}", self.browser, self.manifest_version)
    }

    /// Path relative to the project root, for error messages.
    pub fn relative_to_root(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn resolve_dir(base: &Path, configured: Option<&Path>, default: &str) -> PathBuf {
    match configured {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => base.join(dir),
        None if default.is_empty() => base.to_path_buf(),
        None => base.join(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_for_chrome_build() {
        let config =
            ResolvedConfig::resolve("/project", &UserConfig::default(), Command::Build, None)
                .unwrap();

        assert_eq!(config.browser.as_str(), "chrome");
        assert_eq!(config.manifest_version, ManifestVersion::V3);
        assert_eq!(config.mode, "production");
        assert_eq!(config.entrypoints_dir, PathBuf::from("/project/entrypoints"));
        assert_eq!(config.public_dir, PathBuf::from("/project/public"));
        assert_eq!(config.out_dir, PathBuf::from("/project/.output/chrome-mv3"));
        assert!(config.filter_entrypoints.is_none());
        assert!(!config.is_dev());
    }

    #[test]
    fn firefox_defaults_to_mv2() {
        let user = UserConfig {
            browser: Some("firefox".into()),
            ..Default::default()
        };
        let config = ResolvedConfig::resolve("/project", &user, Command::Serve, None).unwrap();

        assert_eq!(config.manifest_version, ManifestVersion::V2);
        assert_eq!(config.mode, "development");
        assert_eq!(config.target(), "firefox-mv2");
        assert!(config.is_dev());
    }

    #[test]
    fn src_dir_moves_entrypoints_and_public() {
        let user = UserConfig {
            src_dir: Some(PathBuf::from("src")),
            out_dir: Some(PathBuf::from("dist")),
            manifest_version: Some(ManifestVersion::V2),
            ..Default::default()
        };
        let config = ResolvedConfig::resolve("/project", &user, Command::Build, None).unwrap();

        assert_eq!(config.entrypoints_dir, PathBuf::from("/project/src/entrypoints"));
        assert_eq!(config.public_dir, PathBuf::from("/project/src/public"));
        assert_eq!(config.out_dir, PathBuf::from("/project/dist/chrome-mv2"));
    }

    #[test]
    fn empty_browser_is_rejected() {
        let user = UserConfig {
            browser: Some(" ".into()),
            ..Default::default()
        };
        let err = ResolvedConfig::resolve("/project", &user, Command::Build, None).unwrap_err();
        assert!(err.to_string().contains("browser"));
    }

    #[test]
    fn user_config_parses_camel_case() {
        let user: UserConfig = serde_json::from_value(json!({
            "browser": "firefox",
            "manifestVersion": 3,
            "filterEntrypoints": ["popup"],
            "manifest": { "permissions": ["storage"] },
            "dev": { "port": 3100 },
            "bundler": { "command": ["node", "bridge.mjs"] }
        }))
        .unwrap();

        assert_eq!(user.manifest_version, Some(ManifestVersion::V3));
        assert_eq!(user.dev.port, Some(3100));
        assert!(user.bundler.is_configured());
        assert!(!user.loader.is_configured());
        assert_eq!(user.manifest["permissions"], json!(["storage"]));
    }

    #[test]
    fn invalid_manifest_version_fails_to_parse() {
        let result: std::result::Result<UserConfig, _> =
            serde_json::from_value(json!({ "manifestVersion": 4 }));
        assert!(result.is_err());
    }

    #[test]
    fn dev_server_origin_and_permission() {
        let server = DevServerInfo::new("localhost", 3000);
        assert_eq!(server.origin(), "http://localhost:3000");
        assert_eq!(server.host_permission(), "http://localhost/*");
    }

    #[test]
    fn relative_to_root_strips_prefix() {
        let config =
            ResolvedConfig::resolve("/project", &UserConfig::default(), Command::Build, None)
                .unwrap();
        assert_eq!(
            config.relative_to_root(Path::new("/project/entrypoints/popup.html")),
            PathBuf::from("entrypoints/popup.html")
        );
        assert_eq!(
            config.relative_to_root(Path::new("/elsewhere/file.ts")),
            PathBuf::from("/elsewhere/file.ts")
        );
    }
}
