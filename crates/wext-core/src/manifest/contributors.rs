//! Per-kind manifest contributors.
//!
//! Each contributor owns one or more entrypoint kinds and turns the active
//! entrypoints of those kinds into a manifest fragment. Browsers or manifest
//! versions that cannot express a kind get a [`CompatibilityWarning`] instead.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::content_scripts;
use crate::config::{ManifestVersion, ResolvedConfig};
use crate::entrypoint::{
    BackgroundOptions, Entrypoint, EntrypointKind, EntrypointOptions, OptionsPageOptions,
    PopupKey, PopupOptions, SidepanelOptions,
};
use crate::error::CompatibilityWarning;
use crate::output::BuildStep;

/// Inputs shared by every contributor.
#[derive(Debug, Clone, Copy)]
pub struct ContributionContext<'a> {
    pub config: &'a ResolvedConfig,
    pub steps: &'a [BuildStep],
}

impl ContributionContext<'_> {
    fn page(&self, entrypoint: &Entrypoint) -> String {
        entrypoint.bundle_path(&self.config.out_dir, ".html")
    }

    fn script(&self, entrypoint: &Entrypoint) -> String {
        entrypoint.bundle_path(&self.config.out_dir, ".js")
    }

    fn warning(&self, entrypoint: &Entrypoint, message: impl Into<String>) -> CompatibilityWarning {
        CompatibilityWarning {
            entrypoint: self.config.relative_to_root(&entrypoint.input_path),
            message: message.into(),
        }
    }
}

/// A fragment plus anything that had to be left out of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub fragment: Map<String, Value>,
    pub warnings: Vec<CompatibilityWarning>,
}

impl Contribution {
    fn field(key: &str, value: Value) -> Self {
        let mut fragment = Map::new();
        fragment.insert(key.to_string(), value);
        Self {
            fragment,
            warnings: Vec::new(),
        }
    }

    fn warn(warning: CompatibilityWarning) -> Self {
        Self {
            fragment: Map::new(),
            warnings: vec![warning],
        }
    }
}

/// Turns the entrypoints of some kinds into a manifest fragment.
pub trait ManifestContributor: Send + Sync + fmt::Debug {
    /// Kinds this contributor handles.
    fn kinds(&self) -> &'static [EntrypointKind];

    /// Fragment for `entrypoints` (all of [`Self::kinds`], discovery order).
    /// Never called with an empty slice.
    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>)
    -> Contribution;
}

/// Ordered set of contributors. Fragments are merged in registration order.
#[derive(Debug)]
pub struct ContributorRegistry {
    contributors: Vec<Box<dyn ManifestContributor>>,
}

impl ContributorRegistry {
    pub fn empty() -> Self {
        Self {
            contributors: Vec::new(),
        }
    }

    pub fn register(&mut self, contributor: impl ManifestContributor + 'static) -> &mut Self {
        self.contributors.push(Box::new(contributor));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ManifestContributor> {
        self.contributors.iter().map(|c| c.as_ref())
    }
}

impl Default for ContributorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(BackgroundContributor)
            .register(UrlOverrideContributor)
            .register(PopupContributor)
            .register(DevtoolsContributor)
            .register(OptionsContributor)
            .register(SandboxContributor)
            .register(SidepanelContributor)
            .register(content_scripts::ContentScriptContributor);
        registry
    }
}

fn to_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[derive(Debug)]
pub struct BackgroundContributor;

impl ManifestContributor for BackgroundContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Background]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let Some(background) = entrypoints.first() else {
            return Contribution::default();
        };
        let options = match &background.options {
            EntrypointOptions::Background(options) => options.clone(),
            _ => BackgroundOptions::default(),
        };
        let script = ctx.script(background);

        let mut value = Map::new();
        match ctx.config.manifest_version {
            ManifestVersion::V3 => {
                if let Some(module_type) = options.module_type {
                    value.insert("type".into(), json!(module_type));
                }
                value.insert("service_worker".into(), json!(script));
            }
            ManifestVersion::V2 => {
                if let Some(persistent) = options.persistent {
                    value.insert("persistent".into(), json!(persistent));
                }
                value.insert("scripts".into(), json!([script]));
            }
        }
        Contribution::field("background", Value::Object(value))
    }
}

/// `chrome_url_overrides` for newtab, bookmarks and history pages.
#[derive(Debug)]
pub struct UrlOverrideContributor;

impl ManifestContributor for UrlOverrideContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[
            EntrypointKind::Bookmarks,
            EntrypointKind::History,
            EntrypointKind::Newtab,
        ]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let mut overrides = Map::new();
        let mut warnings = Vec::new();

        for kind in self.kinds() {
            let Some(entrypoint) = entrypoints.iter().find(|e| e.kind == *kind) else {
                continue;
            };
            let key = kind.as_str();
            if *kind != EntrypointKind::Newtab && ctx.config.browser.is_firefox() {
                warnings.push(ctx.warning(
                    entrypoint,
                    format!(
                        "{} overrides are not supported by Firefox. chrome_url_overrides.{key} was not added to the manifest",
                        capitalize(key)
                    ),
                ));
                continue;
            }
            overrides.insert(key.to_string(), json!(ctx.page(entrypoint)));
        }

        let mut contribution = if overrides.is_empty() {
            Contribution::default()
        } else {
            Contribution::field("chrome_url_overrides", Value::Object(overrides))
        };
        contribution.warnings = warnings;
        contribution
    }
}

#[derive(Debug)]
pub struct PopupContributor;

impl ManifestContributor for PopupContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Popup]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let Some(popup) = entrypoints.first() else {
            return Contribution::default();
        };
        let options = match &popup.options {
            EntrypointOptions::Popup(options) => options.clone(),
            _ => PopupOptions::default(),
        };

        let mut action = to_map(&options);
        action.insert("default_popup".into(), json!(ctx.page(popup)));

        let key = match ctx.config.manifest_version {
            ManifestVersion::V3 => "action",
            ManifestVersion::V2 => options.mv2_key.unwrap_or(PopupKey::BrowserAction).as_str(),
        };
        Contribution::field(key, Value::Object(action))
    }
}

#[derive(Debug)]
pub struct DevtoolsContributor;

impl ManifestContributor for DevtoolsContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Devtools]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        match entrypoints.first() {
            Some(devtools) => Contribution::field("devtools_page", json!(ctx.page(devtools))),
            None => Contribution::default(),
        }
    }
}

#[derive(Debug)]
pub struct OptionsContributor;

impl ManifestContributor for OptionsContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Options]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let Some(page) = entrypoints.first() else {
            return Contribution::default();
        };
        let mut options = match &page.options {
            EntrypointOptions::Options(options) => options.clone(),
            _ => OptionsPageOptions::default(),
        };
        if ctx.config.browser.is_firefox() {
            options.chrome_style = None;
        } else {
            options.browser_style = None;
        }

        let mut value = to_map(&options);
        value.insert("page".into(), json!(ctx.page(page)));
        Contribution::field("options_ui", Value::Object(value))
    }
}

#[derive(Debug)]
pub struct SandboxContributor;

impl ManifestContributor for SandboxContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Sandbox]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let Some(first) = entrypoints.first() else {
            return Contribution::default();
        };
        if ctx.config.browser.is_firefox() {
            return Contribution::warn(ctx.warning(
                first,
                "Sandboxed pages not supported by Firefox. sandbox.pages was not added to the manifest",
            ));
        }
        let pages: Vec<String> = entrypoints.iter().map(|e| ctx.page(e)).collect();
        Contribution::field("sandbox", json!({ "pages": pages }))
    }
}

/// One side panel per manifest: the entrypoint named `sidepanel`, else the
/// first one discovered.
#[derive(Debug)]
pub struct SidepanelContributor;

impl ManifestContributor for SidepanelContributor {
    fn kinds(&self) -> &'static [EntrypointKind] {
        &[EntrypointKind::Sidepanel]
    }

    fn contribute(&self, entrypoints: &[&Entrypoint], ctx: &ContributionContext<'_>) -> Contribution {
        let Some(panel) = entrypoints
            .iter()
            .find(|e| e.name == "sidepanel")
            .or_else(|| entrypoints.first())
        else {
            return Contribution::default();
        };
        let page = ctx.page(panel);

        if ctx.config.browser.is_firefox() {
            let options = match &panel.options {
                EntrypointOptions::Sidepanel(options) => options.clone(),
                _ => SidepanelOptions::default(),
            };
            let mut action = to_map(&options);
            action.insert("default_panel".into(), json!(page));
            return Contribution::field("sidebar_action", Value::Object(action));
        }

        match ctx.config.manifest_version {
            ManifestVersion::V3 => Contribution::field("side_panel", json!({ "default_path": page })),
            ManifestVersion::V2 => Contribution::warn(ctx.warning(
                panel,
                "Side panel not supported by Chromium using MV2. side_panel.default_path was not added to the manifest",
            )),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Command, UserConfig};
    use crate::entrypoint::{BrowserFilter, output_dir_for};
    use std::path::PathBuf;

    fn config(browser: &str, mv: ManifestVersion) -> ResolvedConfig {
        let user = UserConfig {
            browser: Some(browser.into()),
            manifest_version: Some(mv),
            ..Default::default()
        };
        ResolvedConfig::resolve("/p", &user, Command::Build, None).unwrap()
    }

    fn entry(config: &ResolvedConfig, name: &str, kind: EntrypointKind, options: EntrypointOptions) -> Entrypoint {
        Entrypoint {
            name: name.into(),
            kind,
            input_path: PathBuf::from(format!("/p/entrypoints/{name}.html")),
            output_dir: output_dir_for(kind, &config.out_dir),
            options,
            filter: BrowserFilter::default(),
        }
    }

    fn run(contributor: &dyn ManifestContributor, config: &ResolvedConfig, entrypoints: &[Entrypoint]) -> Contribution {
        let refs: Vec<&Entrypoint> = entrypoints.iter().collect();
        contributor.contribute(&refs, &ContributionContext { config, steps: &[] })
    }

    #[test]
    fn background_per_manifest_version() {
        let options = EntrypointOptions::Background(BackgroundOptions {
            persistent: Some(true),
            module_type: Some("module".into()),
        });

        let mv3 = config("chrome", ManifestVersion::V3);
        let bg = entry(&mv3, "background", EntrypointKind::Background, options.clone());
        let result = run(&BackgroundContributor, &mv3, &[bg]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "background": { "type": "module", "service_worker": "background.js" } })
        );

        let mv2 = config("chrome", ManifestVersion::V2);
        let bg = entry(&mv2, "background", EntrypointKind::Background, options);
        let result = run(&BackgroundContributor, &mv2, &[bg]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "background": { "persistent": true, "scripts": ["background.js"] } })
        );
    }

    #[test]
    fn popup_mv2_key() {
        let mv2 = config("chrome", ManifestVersion::V2);
        let popup = entry(
            &mv2,
            "popup",
            EntrypointKind::Popup,
            EntrypointOptions::Popup(PopupOptions {
                mv2_key: Some(PopupKey::PageAction),
                default_icon: None,
                default_title: Some("Hi".into()),
            }),
        );
        let result = run(&PopupContributor, &mv2, &[popup]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "page_action": { "default_title": "Hi", "default_popup": "popup.html" } })
        );

        let mv3 = config("chrome", ManifestVersion::V3);
        let popup = entry(&mv3, "popup", EntrypointKind::Popup, EntrypointOptions::default_for(EntrypointKind::Popup));
        let result = run(&PopupContributor, &mv3, &[popup]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "action": { "default_popup": "popup.html" } })
        );
    }

    #[test]
    fn options_styles_depend_on_browser() {
        let options = EntrypointOptions::Options(OptionsPageOptions {
            open_in_tab: Some(true),
            browser_style: Some(true),
            chrome_style: Some(false),
        });

        let chrome = config("chrome", ManifestVersion::V3);
        let page = entry(&chrome, "options", EntrypointKind::Options, options.clone());
        let result = run(&OptionsContributor, &chrome, &[page]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "options_ui": { "open_in_tab": true, "chrome_style": false, "page": "options.html" } })
        );

        let firefox = config("firefox", ManifestVersion::V2);
        let page = entry(&firefox, "options", EntrypointKind::Options, options);
        let result = run(&OptionsContributor, &firefox, &[page]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "options_ui": { "open_in_tab": true, "browser_style": true, "page": "options.html" } })
        );
    }

    #[test]
    fn url_overrides_on_firefox_keep_newtab_only() {
        let firefox = config("firefox", ManifestVersion::V2);
        let entrypoints = [
            entry(&firefox, "bookmarks", EntrypointKind::Bookmarks, EntrypointOptions::None),
            entry(&firefox, "newtab", EntrypointKind::Newtab, EntrypointOptions::None),
        ];
        let result = run(&UrlOverrideContributor, &firefox, &entrypoints);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "chrome_url_overrides": { "newtab": "newtab.html" } })
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.starts_with("Bookmarks overrides are not supported"));
        assert_eq!(result.warnings[0].entrypoint, PathBuf::from("entrypoints/bookmarks.html"));
    }

    #[test]
    fn sandbox_on_firefox_is_dropped() {
        let firefox = config("firefox", ManifestVersion::V2);
        let sandbox = entry(&firefox, "sandbox", EntrypointKind::Sandbox, EntrypointOptions::None);
        let result = run(&SandboxContributor, &firefox, &[sandbox]);
        assert!(result.fragment.is_empty());
        assert_eq!(result.warnings.len(), 1);

        let chrome = config("chrome", ManifestVersion::V3);
        let entrypoints = [
            entry(&chrome, "a", EntrypointKind::Sandbox, EntrypointOptions::None),
            entry(&chrome, "b", EntrypointKind::Sandbox, EntrypointOptions::None),
        ];
        let result = run(&SandboxContributor, &chrome, &entrypoints);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "sandbox": { "pages": ["a.html", "b.html"] } })
        );
    }

    #[test]
    fn sidepanel_default_and_targets() {
        let chrome = config("chrome", ManifestVersion::V3);
        let panels = [
            entry(&chrome, "left", EntrypointKind::Sidepanel, EntrypointOptions::None),
            entry(&chrome, "sidepanel", EntrypointKind::Sidepanel, EntrypointOptions::None),
        ];
        let result = run(&SidepanelContributor, &chrome, &panels);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "side_panel": { "default_path": "sidepanel.html" } })
        );

        let firefox = config("firefox", ManifestVersion::V2);
        let panel = entry(
            &firefox,
            "left",
            EntrypointKind::Sidepanel,
            EntrypointOptions::Sidepanel(SidepanelOptions {
                default_title: Some("Notes".into()),
                ..Default::default()
            }),
        );
        let result = run(&SidepanelContributor, &firefox, &[panel]);
        assert_eq!(
            Value::Object(result.fragment),
            json!({ "sidebar_action": { "default_title": "Notes", "default_panel": "left.html" } })
        );

        let chrome_mv2 = config("chrome", ManifestVersion::V2);
        let panel = entry(&chrome_mv2, "left", EntrypointKind::Sidepanel, EntrypointOptions::None);
        let result = run(&SidepanelContributor, &chrome_mv2, &[panel]);
        assert!(result.fragment.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn default_registry_covers_every_manifest_kind() {
        let registry = ContributorRegistry::default();
        let covered: Vec<EntrypointKind> = registry.iter().flat_map(|c| c.kinds().iter().copied()).collect();
        for kind in EntrypointKind::ALL {
            let expected = !matches!(
                kind,
                EntrypointKind::ContentScriptStyle
                    | EntrypointKind::UnlistedPage
                    | EntrypointKind::UnlistedScript
                    | EntrypointKind::UnlistedStyle
            );
            assert_eq!(covered.contains(&kind), expected, "{kind}");
        }
    }
}
