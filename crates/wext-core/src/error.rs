//! Error types for the extension build pipeline.
//!
//! Every stage returns [`CoreError`]. Domain-specific enums ([`ConfigError`],
//! [`ClassificationError`], [`BuildError`]) convert into it via `#[from]`, so
//! stage code can use `?` freely. Paths stored in errors are relative to the
//! project root whenever the offending file is known.
//!
//! Browser/version incompatibilities are not errors: they are reported as
//! [`CompatibilityWarning`] values alongside the build output.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::entrypoint::EntrypointKind;

/// Result alias used across `wext-core`.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Top-level error for a pipeline pass.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration, package metadata or entrypoint filter.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A file could not be mapped to an entrypoint kind.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// The bundler failed for a group.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The definition object of an entrypoint could not be loaded.
    #[error("Failed to load entrypoint definition for {}: {message}", .path.display())]
    Definition {
        /// Entrypoint path relative to the project root
        path: PathBuf,
        /// Loader failure description
        message: String,
    },

    /// Filesystem failure, tagged with the path being accessed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration and package-metadata errors. Always fatal for the pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An entrypoint declared both `include` and `exclude`.
    #[error("Entrypoint {} sets both `include` and `exclude`\n\nHint: Use only one of the two options", .entrypoint.display())]
    ConflictingFilter {
        /// Entrypoint path relative to the project root
        entrypoint: PathBuf,
    },

    /// `package.json` could not be found at the project root.
    #[error("Package metadata not found: {}\n\nHint: Add a package.json with name, description and version", .0.display())]
    PackageNotFound(PathBuf),

    /// `package.json` lacks a required field.
    #[error("package.json does not include a {field}\n\nHint: Add a \"{field}\" field to package.json")]
    MissingPackageField {
        /// Name of the missing field
        field: &'static str,
    },

    /// The declared version has no numeric `X[.Y[.Z[.W]]]` prefix.
    #[error("Cannot simplify package.json version \"{version}\" to a valid extension version, \"X.Y.Z\"")]
    InvalidVersion {
        /// Version as declared in package.json
        version: String,
    },

    /// A configuration value is not valid.
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Configuration key
        field: String,
        /// Offending value
        value: String,
        /// How to fix it
        hint: String,
    },
}

/// Failures while mapping source files to entrypoints.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The file matches no naming convention.
    #[error("Unrecognized entrypoint: {}\n\nHint: Entrypoints must follow <name>.<kind>.<ext> or <name>.<kind>/index.<ext>", .path.display())]
    Unrecognized {
        /// File path relative to the project root
        path: PathBuf,
    },

    /// The kind suffix matched but the extension is not valid for it.
    #[error("Entrypoint {} has an unsupported extension for a {kind} entrypoint", .path.display())]
    ExtensionMismatch {
        /// File path relative to the project root
        path: PathBuf,
        /// Kind resolved from the suffix
        kind: EntrypointKind,
    },

    /// Two entrypoints resolved to a kind that must be unique.
    #[error("Multiple {kind} entrypoints detected: {} and {}\n\nHint: Only one {kind} entrypoint is allowed per target", .first.display(), .second.display())]
    DuplicateSingleton {
        /// The singleton kind
        kind: EntrypointKind,
        /// First entrypoint path relative to the project root
        first: PathBuf,
        /// Conflicting entrypoint path relative to the project root
        second: PathBuf,
    },
}

/// Bundler failure for one group.
#[derive(Debug, Error)]
#[error("Failed to build {group}: {message}")]
pub struct BuildError {
    /// Comma separated entrypoint paths of the failed group
    pub group: String,
    /// Bundler failure description
    pub message: String,
}

/// A manifest fragment that the target browser or manifest version does not
/// support. The fragment is omitted; the build continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityWarning {
    /// Entrypoint path relative to the project root
    pub entrypoint: PathBuf,
    /// What was dropped and why
    pub message: String,
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.entrypoint.display())
    }
}
