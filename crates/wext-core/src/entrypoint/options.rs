//! Entrypoint options.
//!
//! Definitions arrive as JSON objects with camelCase keys (the shape authors
//! write). Any option value may be given per browser:
//!
//! ```json
//! { "persistent": { "firefox": true, "chrome": false } }
//! ```
//!
//! [`resolve_options`] picks the values for the target browser and produces
//! the closed, typed [`EntrypointOptions`] union. The typed structs serialize
//! with manifest field names so contributors can emit them directly.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BrowserFilter, EntrypointKind};
use crate::config::Browser;

/// A value that is either shared by every browser or given per browser.
///
/// The per-browser map is tried first, so a map only counts as per-browser
/// when every value has the option's own type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerBrowser<T> {
    ByBrowser(BTreeMap<String, T>),
    Value(T),
}

impl<T: Clone> PerBrowser<T> {
    /// Value for `browser`. A per-browser map without that browser yields `None`.
    pub fn resolve(&self, browser: &Browser) -> Option<T> {
        match self {
            PerBrowser::Value(value) => Some(value.clone()),
            PerBrowser::ByBrowser(map) => map.get(browser.as_str()).cloned(),
        }
    }
}

fn pick<T: Clone>(option: &Option<PerBrowser<T>>, browser: &Browser) -> Option<T> {
    option.as_ref().and_then(|value| value.resolve(browser))
}

/// MV2 manifest key used for the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupKey {
    BrowserAction,
    PageAction,
}

impl PopupKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PopupKey::BrowserAction => "browser_action",
            PopupKey::PageAction => "page_action",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackgroundOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    /// `"module"` for ES module service workers
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
}

/// Content script options, serialized with manifest field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentScriptOptions {
    pub matches: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_about_blank: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_matches: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_globs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_globs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_frames: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_origin_as_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopupOptions {
    #[serde(skip)]
    pub mv2_key: Option<PopupKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionsPageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_in_tab: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_style: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_style: Option<bool>,
}

/// Firefox `sidebar_action` options; Chromium's `side_panel` takes none.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SidepanelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_at_install: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_style: Option<bool>,
}

/// Resolved options, one variant per kind family.
///
/// Kinds without options of their own (newtab, devtools, sandbox, bookmarks,
/// history, unlisted entrypoints and styles) use [`EntrypointOptions::None`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntrypointOptions {
    Background(BackgroundOptions),
    ContentScript(ContentScriptOptions),
    Popup(PopupOptions),
    Options(OptionsPageOptions),
    Sidepanel(SidepanelOptions),
    None,
}

impl EntrypointOptions {
    /// Options used when a definition declares nothing.
    pub fn default_for(kind: EntrypointKind) -> Self {
        match kind {
            EntrypointKind::Background => Self::Background(BackgroundOptions::default()),
            EntrypointKind::ContentScript => Self::ContentScript(ContentScriptOptions::default()),
            EntrypointKind::Popup => Self::Popup(PopupOptions::default()),
            EntrypointKind::Options => Self::Options(OptionsPageOptions::default()),
            EntrypointKind::Sidepanel => Self::Sidepanel(SidepanelOptions::default()),
            EntrypointKind::ContentScriptStyle
            | EntrypointKind::Devtools
            | EntrypointKind::Newtab
            | EntrypointKind::Sandbox
            | EntrypointKind::Bookmarks
            | EntrypointKind::History
            | EntrypointKind::UnlistedPage
            | EntrypointKind::UnlistedScript
            | EntrypointKind::UnlistedStyle => Self::None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawFilter {
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBackground {
    #[serde(default)]
    persistent: Option<PerBrowser<bool>>,
    #[serde(default, rename = "type")]
    module_type: Option<PerBrowser<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContentScript {
    #[serde(default)]
    matches: Option<PerBrowser<Vec<String>>>,
    #[serde(default)]
    run_at: Option<PerBrowser<String>>,
    #[serde(default)]
    match_about_blank: Option<PerBrowser<bool>>,
    #[serde(default)]
    exclude_matches: Option<PerBrowser<Vec<String>>>,
    #[serde(default)]
    include_globs: Option<PerBrowser<Vec<String>>>,
    #[serde(default)]
    exclude_globs: Option<PerBrowser<Vec<String>>>,
    #[serde(default)]
    all_frames: Option<PerBrowser<bool>>,
    #[serde(default)]
    match_origin_as_fallback: Option<PerBrowser<bool>>,
    #[serde(default)]
    world: Option<PerBrowser<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPopup {
    #[serde(default)]
    mv2_key: Option<PerBrowser<PopupKey>>,
    #[serde(default)]
    default_icon: Option<PerBrowser<BTreeMap<String, String>>>,
    #[serde(default)]
    default_title: Option<PerBrowser<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptionsPage {
    #[serde(default)]
    open_in_tab: Option<PerBrowser<bool>>,
    #[serde(default)]
    browser_style: Option<PerBrowser<bool>>,
    #[serde(default)]
    chrome_style: Option<PerBrowser<bool>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSidepanel {
    #[serde(default)]
    default_icon: Option<PerBrowser<BTreeMap<String, String>>>,
    #[serde(default)]
    default_title: Option<PerBrowser<String>>,
    #[serde(default)]
    open_at_install: Option<PerBrowser<bool>>,
    #[serde(default)]
    browser_style: Option<PerBrowser<bool>>,
}

fn parse<T: DeserializeOwned + Default>(definition: &Value) -> Result<T, serde_json::Error> {
    match definition {
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value.clone()),
    }
}

/// Turn a definition object into typed options and the browser filter.
///
/// # Errors
///
/// Fails when a known option has the wrong shape, e.g. `"matches": "x"`.
pub fn resolve_options(
    kind: EntrypointKind,
    definition: &Value,
    browser: &Browser,
) -> Result<(EntrypointOptions, BrowserFilter), serde_json::Error> {
    let raw_filter: RawFilter = parse(definition)?;
    let filter = BrowserFilter {
        include: raw_filter.include,
        exclude: raw_filter.exclude,
    };

    let options = match kind {
        EntrypointKind::Background => {
            let raw: RawBackground = parse(definition)?;
            EntrypointOptions::Background(BackgroundOptions {
                persistent: pick(&raw.persistent, browser),
                module_type: pick(&raw.module_type, browser),
            })
        }
        EntrypointKind::ContentScript => {
            let raw: RawContentScript = parse(definition)?;
            EntrypointOptions::ContentScript(ContentScriptOptions {
                matches: pick(&raw.matches, browser).unwrap_or_default(),
                run_at: pick(&raw.run_at, browser),
                match_about_blank: pick(&raw.match_about_blank, browser),
                exclude_matches: pick(&raw.exclude_matches, browser),
                include_globs: pick(&raw.include_globs, browser),
                exclude_globs: pick(&raw.exclude_globs, browser),
                all_frames: pick(&raw.all_frames, browser),
                match_origin_as_fallback: pick(&raw.match_origin_as_fallback, browser),
                world: pick(&raw.world, browser),
            })
        }
        EntrypointKind::Popup => {
            let raw: RawPopup = parse(definition)?;
            EntrypointOptions::Popup(PopupOptions {
                mv2_key: pick(&raw.mv2_key, browser),
                default_icon: pick(&raw.default_icon, browser),
                default_title: pick(&raw.default_title, browser),
            })
        }
        EntrypointKind::Options => {
            let raw: RawOptionsPage = parse(definition)?;
            EntrypointOptions::Options(OptionsPageOptions {
                open_in_tab: pick(&raw.open_in_tab, browser),
                browser_style: pick(&raw.browser_style, browser),
                chrome_style: pick(&raw.chrome_style, browser),
            })
        }
        EntrypointKind::Sidepanel => {
            let raw: RawSidepanel = parse(definition)?;
            EntrypointOptions::Sidepanel(SidepanelOptions {
                default_icon: pick(&raw.default_icon, browser),
                default_title: pick(&raw.default_title, browser),
                open_at_install: pick(&raw.open_at_install, browser),
                browser_style: pick(&raw.browser_style, browser),
            })
        }
        other => EntrypointOptions::default_for(other),
    };

    Ok((options, filter))
}
