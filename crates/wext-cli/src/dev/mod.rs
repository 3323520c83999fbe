//! Dev mode plumbing: the file watcher and the static dev server.

pub mod server;
pub mod watcher;

pub use server::{DEFAULT_PORT, DevServer, find_available_port};
pub use watcher::{FileChange, FileWatcher};
