//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//!
//! 1. defaults
//! 2. the `wext` field of `package.json`
//! 3. `wext.toml`
//! 4. `WEXT_*` environment variables (`WEXT_BROWSER`, `WEXT_MANIFEST_VERSION`,
//!    `WEXT_DEV__PORT`, ...)
//! 5. command-line flags

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
    value::{Uncased, UncasedStr},
};
use serde_json::{Map, Value, json};
use tracing::debug;
use wext_core::{ManifestVersion, UserConfig};

use crate::error::{CliError, Result};

pub const CONFIG_FILE: &str = "wext.toml";
pub const PACKAGE_FIELD: &str = "wext";
pub const ENV_PREFIX: &str = "WEXT_";

/// Settings given on the command line. Unset values leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub browser: Option<String>,
    pub manifest_version: Option<ManifestVersion>,
    pub mode: Option<String>,
    pub filter_entrypoints: Vec<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
}

impl CliOverrides {
    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        if let Some(browser) = &self.browser {
            dict.insert("browser".into(), json!(browser));
        }
        if let Some(version) = self.manifest_version {
            dict.insert("manifestVersion".into(), json!(version.number()));
        }
        if let Some(mode) = &self.mode {
            dict.insert("mode".into(), json!(mode));
        }
        if !self.filter_entrypoints.is_empty() {
            dict.insert("filterEntrypoints".into(), json!(self.filter_entrypoints));
        }
        let mut dev = Map::new();
        if let Some(hostname) = &self.hostname {
            dev.insert("hostname".into(), json!(hostname));
        }
        if let Some(port) = self.port {
            dev.insert("port".into(), json!(port));
        }
        if !dev.is_empty() {
            dict.insert("dev".into(), Value::Object(dev));
        }
        dict
    }
}

/// Load the user configuration of the project at `root`.
pub fn load_config(root: &Path, overrides: &CliOverrides) -> Result<UserConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(UserConfig::default()));

    if let Some(section) = package_section(root)? {
        debug!("Using the \"{PACKAGE_FIELD}\" field of package.json");
        figment = figment.merge(Serialized::defaults(section));
    }

    let config_file = root.join(CONFIG_FILE);
    if config_file.is_file() {
        debug!("Using {}", config_file.display());
        figment = figment.merge(Toml::file(config_file));
    }

    figment = figment
        .merge(Env::prefixed(ENV_PREFIX).lowercase(false).map(env_key))
        .merge(Serialized::defaults(overrides.to_dict()));

    Ok(figment.extract()?)
}

/// The `wext` object of `package.json`, if any.
fn package_section(root: &Path) -> Result<Option<Map<String, Value>>> {
    let path = root.join("package.json");
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    // An unparsable package.json is reported by the pipeline when it reads
    // the package metadata.
    let Ok(Value::Object(mut package)) = serde_json::from_str::<Value>(&text) else {
        return Ok(None);
    };
    match package.remove(PACKAGE_FIELD) {
        None => Ok(None),
        Some(Value::Object(section)) => Ok(Some(section)),
        Some(other) => Err(CliError::Custom(format!(
            "The \"{PACKAGE_FIELD}\" field of package.json must be an object, got {other}"
        ))),
    }
}

/// `MANIFEST_VERSION` -> `manifestVersion`, `DEV__PORT` -> `dev.port`.
fn env_key(key: &UncasedStr) -> Uncased<'_> {
    let mapped = key
        .as_str()
        .split("__")
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for c in segment.chars() {
                if c == '_' {
                    upper = true;
                } else if upper {
                    out.extend(c.to_uppercase());
                    upper = false;
                } else {
                    out.extend(c.to_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".");
    Uncased::from_owned(mapped)
}
