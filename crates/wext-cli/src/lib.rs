//! wext CLI - build and develop browser extensions.
//!
//! Thin command-line layer over [`wext_core`]:
//!
//! - [`cli`] - argument definitions (`wext build`, `wext dev`)
//! - [`config`] - layered configuration loading with figment
//! - [`commands`] - command implementations
//! - [`dev`] - file watcher and static dev server
//! - [`error`] - CLI errors with actionable hints
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal output helpers

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
