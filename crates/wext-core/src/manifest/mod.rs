//! Manifest assembly.
//!
//! The manifest is rebuilt from scratch every pass, in four layers:
//!
//! 1. base fields from package metadata
//! 2. fragments from the [`ContributorRegistry`], merged in registration order
//!    (object values are merged one level deep)
//! 3. user overrides from the configuration, replacing top-level keys
//! 4. dev mode only: host permissions for content scripts and the dev server,
//!    and the dev server origin in the script CSP
//!
//! Layer 4 only ever adds values, so user permissions survive it.

pub mod content_scripts;
pub mod contributors;
pub mod csp;

use std::path::PathBuf;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

pub use contributors::{
    Contribution, ContributionContext, ContributorRegistry, ManifestContributor,
};
pub use csp::ContentSecurityPolicy;

use crate::config::{DevServerInfo, ManifestVersion, ResolvedConfig};
use crate::entrypoint::Entrypoint;
use crate::error::{CompatibilityWarning, CoreError, Result};
use crate::output::BuildStep;
use crate::package::PackageMetadata;

/// An assembled manifest and the fragments that were dropped from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledManifest {
    pub manifest: Map<String, Value>,
    pub warnings: Vec<CompatibilityWarning>,
}

/// Builds manifests from a contributor registry.
#[derive(Debug, Default)]
pub struct ManifestAssembler {
    registry: ContributorRegistry,
}

impl ManifestAssembler {
    pub fn new(registry: ContributorRegistry) -> Self {
        Self { registry }
    }

    /// Assemble the manifest for one pass.
    ///
    /// # Errors
    ///
    /// Fails when the package version cannot be simplified.
    pub fn assemble(
        &self,
        config: &ResolvedConfig,
        package: &PackageMetadata,
        entrypoints: &[Entrypoint],
        steps: &[BuildStep],
    ) -> Result<AssembledManifest> {
        let mut manifest = base_manifest(config, package)?;
        let mut warnings = Vec::new();

        let ctx = ContributionContext { config, steps };
        for contributor in self.registry.iter() {
            let kinds = contributor.kinds();
            let owned: Vec<&Entrypoint> = entrypoints
                .iter()
                .filter(|e| kinds.contains(&e.kind))
                .collect();
            if owned.is_empty() {
                continue;
            }
            let contribution = contributor.contribute(&owned, &ctx);
            merge_fragment(&mut manifest, contribution.fragment);
            warnings.extend(contribution.warnings);
        }

        for (key, value) in &config.manifest {
            manifest.insert(key.clone(), value.clone());
        }

        if config.is_dev() {
            let all: Vec<&Entrypoint> = entrypoints.iter().collect();
            content_scripts::add_dev_permissions(&mut manifest, &all, config.manifest_version);
            if let Some(server) = &config.server {
                add_dev_server(&mut manifest, server, config.manifest_version);
            }
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        debug!("Assembled manifest with {} fields", manifest.len());
        Ok(AssembledManifest { manifest, warnings })
    }
}

fn base_manifest(config: &ResolvedConfig, package: &PackageMetadata) -> Result<Map<String, Value>> {
    let mut manifest = Map::new();
    manifest.insert(
        "manifest_version".into(),
        json!(config.manifest_version.number()),
    );
    manifest.insert("name".into(), json!(package.name));
    manifest.insert("description".into(), json!(package.description));
    if let Some(short_name) = &package.short_name {
        manifest.insert("short_name".into(), json!(short_name));
    }
    manifest.insert("version".into(), json!(package.simple_version()?));
    if !config.browser.is_firefox() {
        manifest.insert("version_name".into(), json!(package.version));
    }
    Ok(manifest)
}

/// Merge `fragment` into `manifest`. When both sides hold an object the
/// fragment's keys are added to it; otherwise the fragment value wins.
pub fn merge_fragment(manifest: &mut Map<String, Value>, fragment: Map<String, Value>) {
    for (key, value) in fragment {
        match (manifest.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, value) => {
                manifest.insert(key, value);
            }
        }
    }
}

/// Grant access to the dev server and allow its scripts.
fn add_dev_server(
    manifest: &mut Map<String, Value>,
    server: &DevServerInfo,
    manifest_version: ManifestVersion,
) {
    let key = content_scripts::permissions_key(manifest_version);
    let permission = server.host_permission();
    let permissions = manifest.entry(key).or_insert_with(|| json!([]));
    if !permissions.is_array() {
        *permissions = json!([]);
    }
    if let Value::Array(values) = permissions {
        if !values.iter().any(|v| v.as_str() == Some(permission.as_str())) {
            values.push(json!(permission));
        }
    }

    match manifest_version {
        ManifestVersion::V3 => {
            let existing = manifest
                .get("content_security_policy")
                .and_then(|csp| csp.get("extension_pages"))
                .and_then(Value::as_str)
                .unwrap_or(csp::DEFAULT_MV3_CSP);
            let mut policy = ContentSecurityPolicy::parse(existing);
            policy.add("script-src", &server.origin());

            let csp = manifest
                .entry("content_security_policy")
                .or_insert_with(|| json!({}));
            if !csp.is_object() {
                *csp = json!({});
            }
            if let Value::Object(csp) = csp {
                csp.insert("extension_pages".into(), json!(policy.to_string()));
            }
        }
        ManifestVersion::V2 => {
            let existing = manifest
                .get("content_security_policy")
                .and_then(Value::as_str)
                .unwrap_or(csp::DEFAULT_MV2_CSP);
            let mut policy = ContentSecurityPolicy::parse(existing);
            policy.add("script-src", &server.origin());
            manifest.insert("content_security_policy".into(), json!(policy.to_string()));
        }
    }
}

/// Serialize the manifest: pretty unless the mode is `production`.
pub fn render_manifest(config: &ResolvedConfig, manifest: &Map<String, Value>) -> Result<String> {
    let text = if config.is_production() {
        serde_json::to_string(manifest)?
    } else {
        serde_json::to_string_pretty(manifest)?
    };
    Ok(text)
}

/// Write `<out_dir>/manifest.json` and return its path.
pub async fn write_manifest(
    config: &ResolvedConfig,
    manifest: &Map<String, Value>,
) -> Result<PathBuf> {
    let text = render_manifest(config, manifest)?;
    tokio::fs::create_dir_all(&config.out_dir)
        .await
        .map_err(|err| CoreError::io(&config.out_dir, err))?;
    let path = config.out_dir.join("manifest.json");
    tokio::fs::write(&path, text)
        .await
        .map_err(|err| CoreError::io(&path, err))?;
    Ok(path)
}
