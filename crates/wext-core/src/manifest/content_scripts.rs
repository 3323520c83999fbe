//! `content_scripts` assembly.
//!
//! Content scripts with identical options share one manifest entry. Options
//! are compared through a canonical serialization (object keys sorted at every
//! level), so key order in the definition does not matter.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use super::contributors::{Contribution, ContributionContext, ManifestContributor};
use crate::bundler::{ChunkKind, css_bundle_path};
use crate::config::ManifestVersion;
use crate::entrypoint::{ContentScriptOptions, Entrypoint, EntrypointKind, EntrypointOptions};
use crate::output::all_chunks;

#[derive(Debug)]
pub struct ContentScriptContributor;

impl ManifestContributor for ContentScriptContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::ContentScript]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        // In dev mode scripts are registered at runtime; their matches become
        // host permissions instead (see `add_dev_permissions`).
        if ctx.config.is_dev() || entrypoints.is_empty() {
            return Contribution::default();
        }

        let css_chunks: BTreeSet<&str> = all_chunks(ctx.steps)
            .filter(|chunk| chunk.kind == ChunkKind::Asset)
            .map(|chunk| chunk.file_name.as_str())
            .collect();

        let entries: Vec<Value> = bucket_by_options(entrypoints)
            .into_iter()
            .map(|(options, scripts)| {
                let mut entry = options;
                let mut css: Vec<String> = scripts
                    .iter()
                    .map(|script| css_bundle_path(script))
                    .filter(|path| css_chunks.contains(path.as_str()))
                    .collect();
                if !css.is_empty() {
                    css.sort();
                    entry.insert("css".into(), json!(css));
                }
                let mut js: Vec<String> = scripts
                    .iter()
                    .map(|script| script.bundle_path(&ctx.config.out_dir, ".js"))
                    .collect();
                js.sort();
                entry.insert("js".into(), json!(js));
                Value::Object(entry)
            })
            .collect();

        let mut fragment = Map::new();
        fragment.insert("content_scripts".into(), Value::Array(entries));
        Contribution {
            fragment,
            warnings: Vec::new(),
        }
    }
}

fn options_of(entrypoint: &Entrypoint) -> ContentScriptOptions {
    match &entrypoint.options {
        EntrypointOptions::ContentScript(options) => options.clone(),
        _ => ContentScriptOptions::default(),
    }
}

fn options_map(options: &ContentScriptOptions) -> Map<String, Value> {
    match serde_json::to_value(options) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Group scripts by canonical options, in order of first appearance.
pub fn bucket_by_options<'a>(
    entrypoints: &[&'a Entrypoint],
) -> Vec<(Map<String, Value>, Vec<&'a Entrypoint>)> {
    let mut buckets: Vec<(String, Map<String, Value>, Vec<&'a Entrypoint>)> = Vec::new();
    for &entrypoint in entrypoints {
        let options = options_map(&options_of(entrypoint));
        let key = canonical_json(&Value::Object(options.clone()));
        match buckets.iter_mut().find(|(existing, _, _)| *existing == key) {
            Some((_, _, scripts)) => scripts.push(entrypoint),
            None => buckets.push((key, options, vec![entrypoint])),
        }
    }
    buckets
        .into_iter()
        .map(|(_, options, scripts)| (options, scripts))
        .collect()
}

/// JSON text with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = Map::new();
                for key in keys {
                    out.insert(key.clone(), sorted(&map[key]));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

/// Dev mode: union every content script's matches into the host permission
/// list (`permissions` on MV2), sorted and deduplicated.
pub fn add_dev_permissions(
    manifest: &mut Map<String, Value>,
    entrypoints: &[&Entrypoint],
    manifest_version: ManifestVersion,
) {
    let scripts: Vec<&Entrypoint> = entrypoints
        .iter()
        .copied()
        .filter(|e| e.kind == EntrypointKind::ContentScript)
        .collect();
    if scripts.is_empty() {
        return;
    }

    let key = permissions_key(manifest_version);
    let mut permissions: BTreeSet<String> = manifest
        .get(key)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    for script in scripts {
        permissions.extend(options_of(script).matches);
    }
    manifest.insert(key.into(), json!(permissions));
}

pub(crate) fn permissions_key(manifest_version: ManifestVersion) -> &'static str {
    match manifest_version {
        ManifestVersion::V2 => "permissions",
        ManifestVersion::V3 => "host_permissions",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Chunk;
    use crate::config::{Command, ResolvedConfig, UserConfig};
    use crate::entrypoint::{BrowserFilter, output_dir_for};
    use crate::group::EntrypointGroup;
    use crate::output::BuildStep;
    use std::path::PathBuf;

    fn config(command: Command) -> ResolvedConfig {
        ResolvedConfig::resolve("/p", &UserConfig::default(), command, None).unwrap()
    }

    fn script(config: &ResolvedConfig, name: &str, options: ContentScriptOptions) -> Entrypoint {
        Entrypoint {
            name: name.into(),
            kind: EntrypointKind::ContentScript,
            input_path: PathBuf::from(format!("/p/entrypoints/{name}.content.ts")),
            output_dir: output_dir_for(EntrypointKind::ContentScript, &config.out_dir),
            options: EntrypointOptions::ContentScript(options),
            filter: BrowserFilter::default(),
        }
    }

    fn matching(patterns: &[&str]) -> ContentScriptOptions {
        ContentScriptOptions {
            matches: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn identical_options_share_an_entry() {
        let config = config(Command::Build);
        let b = script(&config, "b", matching(&["*://*.google.com/*"]));
        let a = script(&config, "a", matching(&["*://*.google.com/*"]));
        let c = script(
            &config,
            "c",
            ContentScriptOptions {
                run_at: Some("document_start".into()),
                ..matching(&["*://*.google.com/*"])
            },
        );
        let steps = vec![BuildStep {
            group: EntrypointGroup::Single(a.clone()),
            chunks: vec![
                Chunk::script("content-scripts/a.js"),
                Chunk::asset("content-scripts/a.css"),
            ],
        }];

        let result = ContentScriptContributor.contribute(
            &[&b, &a, &c],
            &ContributionContext {
                config: &config,
                steps: &steps,
            },
        );

        assert_eq!(
            Value::Object(result.fragment),
            json!({
                "content_scripts": [
                    {
                        "matches": ["*://*.google.com/*"],
                        "css": ["content-scripts/a.css"],
                        "js": ["content-scripts/a.js", "content-scripts/b.js"]
                    },
                    {
                        "matches": ["*://*.google.com/*"],
                        "run_at": "document_start",
                        "js": ["content-scripts/c.js"]
                    }
                ]
            })
        );
    }

    #[test]
    fn dev_mode_emits_no_entries() {
        let config = config(Command::Serve);
        let a = script(&config, "a", matching(&["<all_urls>"]));
        let result = ContentScriptContributor.contribute(
            &[&a],
            &ContributionContext {
                config: &config,
                steps: &[],
            },
        );
        assert!(result.fragment.is_empty());
    }

    #[test]
    fn dev_permissions_are_sorted_and_unique() {
        let config = config(Command::Serve);
        let a = script(&config, "a", matching(&["https://b.com/*", "https://a.com/*"]));
        let b = script(&config, "b", matching(&["https://a.com/*"]));
        let mut manifest = Map::new();
        manifest.insert("host_permissions".into(), json!(["https://z.com/*"]));

        add_dev_permissions(&mut manifest, &[&a, &b], ManifestVersion::V3);
        assert_eq!(
            manifest["host_permissions"],
            json!(["https://a.com/*", "https://b.com/*", "https://z.com/*"])
        );

        let mut mv2 = Map::new();
        add_dev_permissions(&mut mv2, &[&b], ManifestVersion::V2);
        assert_eq!(mv2["permissions"], json!(["https://a.com/*"]));
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let left = json!({ "b": 1, "a": { "d": [ { "y": 1, "x": 2 } ], "c": null } });
        let right = json!({ "a": { "c": null, "d": [ { "x": 2, "y": 1 } ] }, "b": 1 });
        assert_eq!(canonical_json(&left), canonical_json(&right));
        assert_eq!(canonical_json(&right), r#"{"a":{"c":null,"d":[{"x":2,"y":1}]},"b":1}"#);
    }
}
