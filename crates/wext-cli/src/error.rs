//! Error handling for the wext CLI.
//!
//! [`CliError`] wraps pipeline errors from `wext-core` together with the
//! failures only the CLI can hit (configuration sources, the watcher, the dev
//! server). Messages carry a `Hint:` line where there is something the user
//! can do about it. `main` turns the final error into a miette report.

use std::path::PathBuf;

use thiserror::Error;
use wext_core::CoreError;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Errors from the build pipeline
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration sources could not be merged or extracted
    #[error(
        "Invalid configuration: {0}\n\nHint: Check wext.toml, the \"wext\" field of package.json and WEXT_* environment variables"
    )]
    Config(#[from] figment::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("Directory not found: {}\n\nHint: Pass the extension project directory as the first argument", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Report a missing file as [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a `Hint:` line to the error.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Convert a CLI error into a miette report.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Core(CoreError::Build(e)) => miette::miette!(
            "Build failed for {}:\n{}\n\nHint: Fix the error above and run the command again",
            e.group,
            e.message
        ),
        CliError::Core(e) => miette::miette!("{}", e),
        _ => miette::miette!("{}", err),
    }
}
