//! Build pipeline for browser extensions.
//!
//! `wext-core` turns a directory of entrypoint files into a loadable extension:
//!
//! - [`entrypoint`] classifies files by naming convention and resolves their
//!   per-browser options
//! - [`group`] partitions entrypoints into bundler invocations
//! - [`bundler`] is the seam to the JavaScript bundler
//! - [`manifest`] assembles `manifest.json` from metadata, build output and
//!   user overrides
//! - [`pipeline`] orchestrates production builds and dev mode rebuilds
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wext_core::{
//!     Command, CopyBundler, DefaultLoader, Pipeline, ResolvedConfig, UserConfig,
//! };
//!
//! # async fn run() -> wext_core::Result<()> {
//! let config = ResolvedConfig::resolve(".", &UserConfig::default(), Command::Build, None)?;
//! let pipeline = Pipeline::new(
//!     Arc::new(config),
//!     Arc::new(DefaultLoader::default()),
//!     Arc::new(CopyBundler::new()),
//! );
//! let output = pipeline.build().await?;
//! println!("{} files", output.files().len());
//! # Ok(())
//! # }
//! ```

pub mod bundler;
pub mod config;
pub mod definition;
pub mod entrypoint;
pub mod error;
pub mod group;
pub mod manifest;
pub mod output;
pub mod package;
pub mod pipeline;

mod process;

pub use bundler::{BuildContext, Bundler, Chunk, ChunkKind, CommandBundler, CopyBundler};
pub use config::{
    Browser, Command, DevOptions, DevServerInfo, ExternalCommand, ManifestVersion,
    ResolvedConfig, UserConfig,
};
pub use definition::{CommandLoader, DefaultLoader, DefinitionLoader, HtmlMetaLoader};
pub use entrypoint::{Entrypoint, EntrypointKind, EntrypointOptions};
pub use error::{
    BuildError, ClassificationError, CompatibilityWarning, ConfigError, CoreError, Result,
};
pub use group::{EntrypointGroup, GroupKey, group_entrypoints};
pub use manifest::{AssembledManifest, ManifestAssembler};
pub use output::{BuildOutput, BuildStep};
pub use package::PackageMetadata;
pub use pipeline::{
    BuildProgress, ChangeQueue, Pipeline, PipelineState, ProgressCallback, run_dev_loop,
};
