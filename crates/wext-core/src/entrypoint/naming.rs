//! Naming convention parser.
//!
//! Maps a file under the entrypoints directory to an entrypoint name and kind.
//! Two layouts are recognised:
//!
//! - flat: `<name>[.<suffix>].<ext>` directly in the entrypoints directory
//! - directory: `<name>[.<suffix>]/index.<ext>` exactly one level deep
//!
//! Every other file is a dependency of some entrypoint and is not classified.

use std::path::{Component, Path};

use tracing::debug;

use super::{EntrypointKind, entrypoint_name};
use crate::config::ResolvedConfig;
use crate::error::ClassificationError;

const HTML: &[&str] = &["html"];
const SCRIPT: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs", "cts", "cjs"];
const STYLE: &[&str] = &["css", "scss", "sass", "less", "styl"];

/// A naming rule: files whose suffix is `suffix` and whose extension is one
/// of `extensions` are entrypoints of `kind`.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: EntrypointKind,
    pub suffix: &'static str,
    pub extensions: &'static [&'static str],
}

/// Suffix rules, in lookup order. `content` appears twice: scripts and styles.
pub const KIND_REGISTRY: &[KindDescriptor] = &[
    KindDescriptor {
        kind: EntrypointKind::ContentScript,
        suffix: "content",
        extensions: SCRIPT,
    },
    KindDescriptor {
        kind: EntrypointKind::ContentScriptStyle,
        suffix: "content",
        extensions: STYLE,
    },
    KindDescriptor {
        kind: EntrypointKind::Background,
        suffix: "background",
        extensions: SCRIPT,
    },
    KindDescriptor {
        kind: EntrypointKind::Sandbox,
        suffix: "sandbox",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Popup,
        suffix: "popup",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Options,
        suffix: "options",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Devtools,
        suffix: "devtools",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Newtab,
        suffix: "newtab",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Sidepanel,
        suffix: "sidepanel",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::Bookmarks,
        suffix: "bookmarks",
        extensions: HTML,
    },
    KindDescriptor {
        kind: EntrypointKind::History,
        suffix: "history",
        extensions: HTML,
    },
];

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub name: String,
    pub kind: EntrypointKind,
}

/// True when any component of `relative` starts with a dot.
pub fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// True when `path` sits directly in the entrypoints directory.
pub fn is_top_level(entrypoints_dir: &Path, path: &Path) -> bool {
    path.strip_prefix(entrypoints_dir)
        .map(|relative| relative.components().count() == 1)
        .unwrap_or(false)
}

/// Whether `path` is in an entrypoint position at all (ignoring its name).
pub fn is_candidate(entrypoints_dir: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(entrypoints_dir) else {
        return false;
    };
    if is_hidden(relative) {
        return false;
    }
    let parts: Vec<_> = relative.components().collect();
    match parts.as_slice() {
        [_] => true,
        [_, file] => file_stem(file.as_os_str().to_string_lossy().as_ref()) == "index",
        _ => false,
    }
}

/// Classify `path` (absolute) against the naming convention.
///
/// Returns `Ok(None)` for files that are not entrypoint candidates: hidden
/// paths, files outside the entrypoints directory and dependency files nested
/// inside an entrypoint directory.
///
/// # Errors
///
/// [`ClassificationError::Unrecognized`] for an unknown extension and
/// [`ClassificationError::ExtensionMismatch`] when a suffix matched but the
/// extension is not allowed for that kind.
pub fn classify(
    config: &ResolvedConfig,
    path: &Path,
) -> Result<Option<Classification>, ClassificationError> {
    let entrypoints_dir = &config.entrypoints_dir;
    if !is_candidate(entrypoints_dir, path) {
        debug!("Skipping {} (not an entrypoint candidate)", path.display());
        return Ok(None);
    }
    let Ok(relative) = path.strip_prefix(entrypoints_dir) else {
        return Ok(None);
    };

    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();

    // For the directory layout the directory name carries name and suffix,
    // the index file carries the extension.
    let (base, ext) = match parts.as_slice() {
        [file] => (file_stem(file).to_string(), file_extension(file)),
        [dir, file] => (dir.clone(), file_extension(file)),
        _ => return Ok(None),
    };

    let name = entrypoint_name(entrypoints_dir, path);
    let segments: Vec<&str> = base.split('.').collect();
    let suffix = match segments.as_slice() {
        [single] => {
            let bare = *single;
            KIND_REGISTRY
                .iter()
                .any(|descriptor| descriptor.suffix == bare)
                .then_some(bare)
        }
        [.., last] => KIND_REGISTRY
            .iter()
            .any(|descriptor| descriptor.suffix == *last)
            .then_some(*last),
        [] => None,
    };

    let display_path = config.relative_to_root(path);
    let kind = match suffix {
        Some(suffix) => kind_for_suffix(suffix, ext).ok_or_else(|| {
            let kind = KIND_REGISTRY
                .iter()
                .find(|descriptor| descriptor.suffix == suffix)
                .map(|descriptor| descriptor.kind)
                .unwrap_or(EntrypointKind::UnlistedScript);
            ClassificationError::ExtensionMismatch {
                path: display_path.clone(),
                kind,
            }
        })?,
        None => kind_for_extension(ext).ok_or_else(|| ClassificationError::Unrecognized {
            path: display_path.clone(),
        })?,
    };

    debug!("Classified {} as {kind} \"{name}\"", display_path.display());
    Ok(Some(Classification { name, kind }))
}

fn kind_for_suffix(suffix: &str, ext: &str) -> Option<EntrypointKind> {
    KIND_REGISTRY
        .iter()
        .find(|descriptor| descriptor.suffix == suffix && descriptor.extensions.contains(&ext))
        .map(|descriptor| descriptor.kind)
}

fn kind_for_extension(ext: &str) -> Option<EntrypointKind> {
    if HTML.contains(&ext) {
        Some(EntrypointKind::UnlistedPage)
    } else if SCRIPT.contains(&ext) {
        Some(EntrypointKind::UnlistedScript)
    } else if STYLE.contains(&ext) {
        Some(EntrypointKind::UnlistedStyle)
    } else {
        None
    }
}

fn file_stem(file: &str) -> &str {
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

fn file_extension(file: &str) -> &str {
    file.rsplit_once('.').map_or("", |(_, ext)| ext)
}
