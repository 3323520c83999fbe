//! The bundler seam.
//!
//! The pipeline never compiles anything itself. Each [`EntrypointGroup`] is
//! handed to a [`Bundler`] together with a [`BuildContext`]; the bundler
//! writes its files under `out_dir` and reports what it wrote as [`Chunk`]s.
//! Only chunk file names and kinds are inspected afterwards.

mod command;
mod copy;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use command::CommandBundler;
pub use copy::CopyBundler;

use crate::config::{Browser, Command, ManifestVersion, ResolvedConfig};
use crate::entrypoint::{Entrypoint, EntrypointKind};
use crate::error::Result;
use crate::group::EntrypointGroup;

/// File name template for chunks shared between HTML pages.
pub const MULTI_PAGE_CHUNK_TEMPLATE: &str = "chunks/[name]-[hash].js";

/// File name template for other emitted assets.
pub const ASSET_TEMPLATE: &str = "assets/[name]-[hash].[ext]";

/// What kind of file a chunk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    #[serde(alias = "chunk")]
    Script,
    Asset,
}

/// One file written by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Path relative to the output directory, `/` separated
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn script(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ChunkKind::Script,
        }
    }

    pub fn asset(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ChunkKind::Asset,
        }
    }
}

/// Build settings shared by every group of a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    pub mode: String,
    pub command: Command,
    pub out_dir: PathBuf,
    pub root: PathBuf,
    pub browser: Browser,
    pub manifest_version: ManifestVersion,
}

impl BuildContext {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            mode: config.mode.clone(),
            command: config.command,
            out_dir: config.out_dir.clone(),
            root: config.root.clone(),
            browser: config.browser.clone(),
            manifest_version: config.manifest_version,
        }
    }
}

/// Compiles one group into output files.
#[async_trait]
pub trait Bundler: Send + Sync + fmt::Debug {
    /// Build `group`, writing under `ctx.out_dir`.
    ///
    /// Returns the written files in a deterministic order.
    async fn build(&self, group: &EntrypointGroup, ctx: &BuildContext) -> Result<Vec<Chunk>>;
}

/// Main bundle path of an entrypoint, relative to the output directory.
pub fn bundle_path(entrypoint: &Entrypoint, ctx: &BuildContext) -> String {
    entrypoint.default_bundle_path(&ctx.out_dir)
}

/// Stylesheet path of an entrypoint: `content-scripts/<name>.css` for
/// content scripts and their styles, `assets/<name>.css` otherwise.
pub fn css_bundle_path(entrypoint: &Entrypoint) -> String {
    match entrypoint.kind {
        EntrypointKind::ContentScript | EntrypointKind::ContentScriptStyle => {
            format!("content-scripts/{}.css", entrypoint.name)
        }
        _ => format!("assets/{}.css", entrypoint.name),
    }
}
