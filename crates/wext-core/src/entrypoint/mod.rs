//! Entrypoints: the typed units the pipeline builds.
//!
//! An entrypoint is a file under the entrypoints directory whose path follows
//! the naming convention (see [`naming`]). Its kind decides how it is built,
//! where its output lands, and what it contributes to the manifest.

pub mod discovery;
pub mod filter;
pub mod naming;
pub mod options;

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use discovery::discover;
pub use filter::BrowserFilter;
pub use naming::{Classification, classify};
pub use options::{
    BackgroundOptions, ContentScriptOptions, EntrypointOptions, OptionsPageOptions, PerBrowser,
    PopupKey, PopupOptions, SidepanelOptions,
};

/// Closed set of entrypoint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntrypointKind {
    Background,
    ContentScript,
    ContentScriptStyle,
    Popup,
    Options,
    Devtools,
    Newtab,
    Sidepanel,
    Sandbox,
    Bookmarks,
    History,
    UnlistedPage,
    UnlistedScript,
    UnlistedStyle,
}

impl EntrypointKind {
    pub const ALL: [EntrypointKind; 14] = [
        EntrypointKind::Background,
        EntrypointKind::ContentScript,
        EntrypointKind::ContentScriptStyle,
        EntrypointKind::Popup,
        EntrypointKind::Options,
        EntrypointKind::Devtools,
        EntrypointKind::Newtab,
        EntrypointKind::Sidepanel,
        EntrypointKind::Sandbox,
        EntrypointKind::Bookmarks,
        EntrypointKind::History,
        EntrypointKind::UnlistedPage,
        EntrypointKind::UnlistedScript,
        EntrypointKind::UnlistedStyle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntrypointKind::Background => "background",
            EntrypointKind::ContentScript => "content-script",
            EntrypointKind::ContentScriptStyle => "content-script-style",
            EntrypointKind::Popup => "popup",
            EntrypointKind::Options => "options",
            EntrypointKind::Devtools => "devtools",
            EntrypointKind::Newtab => "newtab",
            EntrypointKind::Sidepanel => "sidepanel",
            EntrypointKind::Sandbox => "sandbox",
            EntrypointKind::Bookmarks => "bookmarks",
            EntrypointKind::History => "history",
            EntrypointKind::UnlistedPage => "unlisted-page",
            EntrypointKind::UnlistedScript => "unlisted-script",
            EntrypointKind::UnlistedStyle => "unlisted-style",
        }
    }

    /// Kinds that may appear at most once per target.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            EntrypointKind::Background
                | EntrypointKind::Popup
                | EntrypointKind::Options
                | EntrypointKind::Devtools
                | EntrypointKind::Newtab
                | EntrypointKind::Bookmarks
                | EntrypointKind::History
        )
    }

    /// Kinds built as HTML pages in the shared multi-page build.
    pub fn is_html_page(self) -> bool {
        matches!(
            self,
            EntrypointKind::Popup
                | EntrypointKind::Options
                | EntrypointKind::Devtools
                | EntrypointKind::Newtab
                | EntrypointKind::Sidepanel
                | EntrypointKind::Sandbox
                | EntrypointKind::Bookmarks
                | EntrypointKind::History
                | EntrypointKind::UnlistedPage
        )
    }

    /// Kinds producing a single stylesheet.
    pub fn is_style(self) -> bool {
        matches!(
            self,
            EntrypointKind::ContentScriptStyle | EntrypointKind::UnlistedStyle
        )
    }

    /// Extension of the file the kind is bundled into.
    pub fn bundle_extension(self) -> &'static str {
        if self.is_html_page() {
            ".html"
        } else if self.is_style() {
            ".css"
        } else {
            ".js"
        }
    }

    /// Directory (relative to the output directory) the kind's bundle lands in.
    pub fn output_subdir(self) -> Option<&'static str> {
        match self {
            EntrypointKind::ContentScript | EntrypointKind::ContentScriptStyle => {
                Some("content-scripts")
            }
            EntrypointKind::UnlistedStyle => Some("assets"),
            _ => None,
        }
    }
}

impl fmt::Display for EntrypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, option-resolved entrypoint for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entrypoint {
    /// Name derived from the input path (`overlay.content/index.ts` -> `overlay`)
    pub name: String,
    pub kind: EntrypointKind,
    /// Absolute path of the input file
    pub input_path: PathBuf,
    /// Absolute directory the bundle is written to
    pub output_dir: PathBuf,
    pub options: EntrypointOptions,
    pub filter: BrowserFilter,
}

impl Entrypoint {
    /// Output file path relative to `out_dir`, always with `/` separators.
    ///
    /// This is the path the manifest references and the bundler writes to.
    pub fn bundle_path(&self, out_dir: &Path, ext: &str) -> String {
        let file = self.output_dir.join(format!("{}{}", self.name, ext));
        let relative = file.strip_prefix(out_dir).unwrap_or(&file);
        normalize_path(relative)
    }

    /// Bundle path using the kind's default extension.
    pub fn default_bundle_path(&self, out_dir: &Path) -> String {
        self.bundle_path(out_dir, self.kind.bundle_extension())
    }
}

/// Entrypoint name: the relative path up to its first `.` or separator.
pub fn entrypoint_name(entrypoints_dir: &Path, input_path: &Path) -> String {
    let relative = input_path.strip_prefix(entrypoints_dir).unwrap_or(input_path);
    let relative = normalize_path(relative);
    relative
        .split(['.', '/'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Absolute output directory for an entrypoint of `kind`.
pub fn output_dir_for(kind: EntrypointKind, out_dir: &Path) -> PathBuf {
    match kind.output_subdir() {
        Some(subdir) => out_dir.join(subdir),
        None => out_dir.to_path_buf(),
    }
}

/// Join path components with `/` regardless of platform.
pub fn normalize_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntrypointKind) -> Entrypoint {
        let out = Path::new("/p/.output/chrome-mv3");
        Entrypoint {
            name: name.to_string(),
            kind,
            input_path: PathBuf::from(format!("/p/entrypoints/{name}")),
            output_dir: output_dir_for(kind, out),
            options: EntrypointOptions::default_for(kind),
            filter: BrowserFilter::default(),
        }
    }

    #[test]
    fn name_from_flat_and_directory_styles() {
        let root = Path::new("/p/entrypoints");
        let cases = [
            ("popup.html", "popup"),
            ("options/index.html", "options"),
            ("named.sandbox.html", "named"),
            ("named.sandbox/index.html", "named"),
            ("overlay.content.ts", "overlay"),
            ("overlay.content/index.ts", "overlay"),
        ];
        for (relative, expected) in cases {
            assert_eq!(entrypoint_name(root, &root.join(relative)), expected, "{relative}");
        }
    }

    #[test]
    fn bundle_paths_per_kind() {
        let out = Path::new("/p/.output/chrome-mv3");

        let background = entry("background", EntrypointKind::Background);
        assert_eq!(background.default_bundle_path(out), "background.js");

        let content = entry("overlay", EntrypointKind::ContentScript);
        assert_eq!(content.default_bundle_path(out), "content-scripts/overlay.js");
        assert_eq!(content.bundle_path(out, ".css"), "content-scripts/overlay.css");

        let style = entry("theme", EntrypointKind::UnlistedStyle);
        assert_eq!(style.default_bundle_path(out), "assets/theme.css");

        let popup = entry("popup", EntrypointKind::Popup);
        assert_eq!(popup.default_bundle_path(out), "popup.html");
    }

    #[test]
    fn singletons() {
        let singletons: Vec<_> = EntrypointKind::ALL
            .into_iter()
            .filter(|kind| kind.is_singleton())
            .map(EntrypointKind::as_str)
            .collect();
        assert_eq!(
            singletons,
            ["background", "popup", "options", "devtools", "newtab", "bookmarks", "history"]
        );
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EntrypointKind::ContentScriptStyle).unwrap();
        assert_eq!(json, "\"content-script-style\"");
        assert_eq!(EntrypointKind::UnlistedPage.to_string(), "unlisted-page");
    }
}
