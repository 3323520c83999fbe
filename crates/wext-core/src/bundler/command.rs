//! Bundler bridge to an external program.
//!
//! One process per group. The request on stdin:
//!
//! ```json
//! {
//!   "group": "single" | "multi-page",
//!   "entrypoints": [{ "name", "kind", "inputPath", "bundlePath", "cssPath", "options" }],
//!   "context": { "mode", "command", "outDir", "root", "browser", "manifestVersion" },
//!   "templates": { "chunk": "chunks/[name]-[hash].js", "asset": "assets/[name]-[hash].[ext]" }
//! }
//! ```
//!
//! The program writes the files and answers `{"chunks": [{"fileName", "type"}]}`.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    ASSET_TEMPLATE, BuildContext, Bundler, Chunk, MULTI_PAGE_CHUNK_TEMPLATE, bundle_path,
    css_bundle_path,
};
use crate::entrypoint::{EntrypointKind, EntrypointOptions};
use crate::error::{BuildError, Result};
use crate::group::EntrypointGroup;
use crate::process::run_json;

#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: Vec<String>,
}

impl CommandBundler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntrypointRequest<'a> {
    name: &'a str,
    kind: EntrypointKind,
    input_path: &'a Path,
    bundle_path: String,
    css_path: String,
    options: &'a EntrypointOptions,
}

#[derive(Serialize)]
struct Templates {
    chunk: &'static str,
    asset: &'static str,
}

#[derive(Serialize)]
struct BuildRequest<'a> {
    group: &'static str,
    entrypoints: Vec<EntrypointRequest<'a>>,
    context: &'a BuildContext,
    templates: Templates,
}

#[derive(Deserialize)]
struct BuildResponse {
    #[serde(default)]
    chunks: Vec<Chunk>,
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build(&self, group: &EntrypointGroup, ctx: &BuildContext) -> Result<Vec<Chunk>> {
        let request = BuildRequest {
            group: match group {
                EntrypointGroup::Single(_) => "single",
                EntrypointGroup::MultiPage(_) => "multi-page",
            },
            entrypoints: group
                .entrypoints()
                .iter()
                .map(|entrypoint| EntrypointRequest {
                    name: &entrypoint.name,
                    kind: entrypoint.kind,
                    input_path: &entrypoint.input_path,
                    bundle_path: bundle_path(entrypoint, ctx),
                    css_path: css_bundle_path(entrypoint),
                    options: &entrypoint.options,
                })
                .collect(),
            context: ctx,
            templates: Templates {
                chunk: MULTI_PAGE_CHUNK_TEMPLATE,
                asset: ASSET_TEMPLATE,
            },
        };

        let response: BuildResponse = run_json(&self.command, &ctx.root, &request)
            .await
            .map_err(|message| BuildError {
                group: group.describe(&ctx.root),
                message,
            })?;
        Ok(response.chunks)
    }
}
