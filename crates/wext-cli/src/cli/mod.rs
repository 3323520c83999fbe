//! Command-line interface definition.
//!
//! - `wext build [ROOT]` - production build for one browser target
//! - `wext dev [ROOT]` - dev mode: initial build, watcher, incremental rebuilds

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs, TargetArgs};

/// wext - build browser extensions from a directory of entrypoints
#[derive(Parser, Debug)]
#[command(
    name = "wext",
    version,
    about = "Build browser extensions from a directory of entrypoints",
    long_about = "wext discovers entrypoints by file naming convention, bundles them,\n\
                  and generates manifest.json for the target browser and manifest version."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use wext_core::ManifestVersion;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_defaults() {
        let cli = Cli::try_parse_from(["wext", "build"]).unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.target.root, std::path::PathBuf::from("."));
        assert_eq!(args.target.manifest_version(), None);
        assert!(args.target.browser.is_none());
    }

    #[test]
    fn target_flags() {
        let cli = Cli::try_parse_from([
            "wext", "build", "ext", "-b", "firefox", "--mv3", "--mode", "staging", "-e", "popup",
            "-e", "background",
        ])
        .unwrap();
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.target.browser.as_deref(), Some("firefox"));
        assert_eq!(args.target.manifest_version(), Some(ManifestVersion::V3));
        assert_eq!(args.target.mode.as_deref(), Some("staging"));
        assert_eq!(args.target.filter_entrypoints, vec!["popup", "background"]);
    }

    #[test]
    fn mv2_and_mv3_conflict() {
        assert!(Cli::try_parse_from(["wext", "build", "--mv2", "--mv3"]).is_err());
    }

    #[test]
    fn dev_server_flags() {
        let cli = Cli::try_parse_from(["wext", "dev", "--port", "3005", "--host", "127.0.0.1"])
            .unwrap();
        let Command::Dev(args) = cli.command else {
            panic!("expected dev");
        };
        assert_eq!(args.port, Some(3005));
        assert_eq!(args.host.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["wext", "-v", "-q", "build"]).is_err());
    }
}
