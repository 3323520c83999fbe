use std::path::PathBuf;

use clap::{Args, Subcommand};
use wext_core::ManifestVersion;

use crate::config::CliOverrides;

/// Available wext subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the extension for production
    ///
    /// Clears the output directory, builds every entrypoint and writes
    /// manifest.json to `<outDir>/<browser>-mv<version>`.
    Build(BuildArgs),

    /// Build, then rebuild on every change
    ///
    /// Serves the output directory and rebuilds only the entrypoints
    /// affected by each change. Build errors are reported and the last
    /// successful output is kept.
    Dev(DevArgs),
}

/// Options selecting the project and build target.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Extension project directory
    #[arg(default_value = ".", value_name = "ROOT")]
    pub root: PathBuf,

    /// Target browser (chrome, firefox, edge, safari, ...)
    #[arg(short, long)]
    pub browser: Option<String>,

    /// Target manifest version 2
    #[arg(long, conflicts_with = "mv3")]
    pub mv2: bool,

    /// Target manifest version 3
    #[arg(long)]
    pub mv3: bool,

    /// Build mode, exposed to the bundler
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Only build the named entrypoints (repeatable)
    #[arg(short = 'e', long = "filter-entrypoint", value_name = "NAME")]
    pub filter_entrypoints: Vec<String>,
}

impl TargetArgs {
    pub fn manifest_version(&self) -> Option<ManifestVersion> {
        match (self.mv2, self.mv3) {
            (true, _) => Some(ManifestVersion::V2),
            (_, true) => Some(ManifestVersion::V3),
            _ => None,
        }
    }

    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            browser: self.browser.clone(),
            manifest_version: self.manifest_version(),
            mode: self.mode.clone(),
            filter_entrypoints: self.filter_entrypoints.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Dev server port (default: first free port from 3000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Dev server hostname
    #[arg(long)]
    pub host: Option<String>,
}

impl DevArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            hostname: self.host.clone(),
            port: self.port,
            ..self.target.overrides()
        }
    }
}
