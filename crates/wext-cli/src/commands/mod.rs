//! Command implementations.

pub mod build;
pub mod dev;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wext_core::{
    BuildOutput, Bundler, CommandBundler, CommandLoader, CopyBundler, DefaultLoader, Pipeline,
    ResolvedConfig, UserConfig,
};

use crate::error::{CliError, Result, ResultExt};
use crate::ui;

/// Absolute project root; it must be an existing directory.
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = std::path::absolute(root).with_path(root)?;
    if !root.is_dir() {
        return Err(CliError::FileNotFound(root));
    }
    Ok(root)
}

/// Pipeline wired with the configured loader and bundler commands, falling
/// back to the built-in ones.
pub(crate) fn create_pipeline(config: ResolvedConfig, user: &UserConfig) -> Pipeline {
    let scripts = user
        .loader
        .is_configured()
        .then(|| CommandLoader::new(user.loader.command.clone(), &config.root));
    let bundler: Arc<dyn Bundler> = if user.bundler.is_configured() {
        Arc::new(CommandBundler::new(user.bundler.command.clone()))
    } else {
        Arc::new(CopyBundler::new())
    };
    Pipeline::new(
        Arc::new(config),
        Arc::new(DefaultLoader::new(scripts)),
        bundler,
    )
}

/// Output files with their sizes, for the build summary.
pub(crate) fn output_sizes(out_dir: &Path, output: &BuildOutput) -> Vec<(String, u64)> {
    output
        .files()
        .into_iter()
        .map(|file| {
            let size = std::fs::metadata(out_dir.join(file))
                .map(|meta| meta.len())
                .unwrap_or(0);
            (file.to_string(), size)
        })
        .collect()
}

pub(crate) fn report_warnings(output: &BuildOutput) {
    for warning in &output.warnings {
        ui::warning(&warning.to_string());
    }
}
