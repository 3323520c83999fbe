//! Static dev server for the output directory.
//!
//! Its origin is added to the extension's CSP and host permissions in dev
//! mode, so pages of the extension can load files from it.

use std::net::TcpListener as StdListener;
use std::path::PathBuf;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir};
use wext_core::DevServerInfo;

use crate::error::{CliError, Result};

pub const DEFAULT_PORT: u16 = 3000;
const PORT_RANGE: u16 = 10;

/// A bound dev server, ready to run.
pub struct DevServer {
    listener: TcpListener,
    info: DevServerInfo,
    out_dir: PathBuf,
}

impl DevServer {
    /// Bind to `info.hostname:info.port`.
    pub async fn bind(info: DevServerInfo, out_dir: PathBuf) -> Result<Self> {
        let addr = format!("{}:{}", info.hostname, info.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {addr}: {e}")))?;
        Ok(Self {
            listener,
            info,
            out_dir,
        })
    }

    pub fn info(&self) -> &DevServerInfo {
        &self.info
    }

    /// Serve until the task is dropped.
    pub async fn run(self) -> Result<()> {
        let app = router(self.out_dir, self.info);
        axum::serve(self.listener, app)
            .await
            .map_err(|e| CliError::Server(e.to_string()))
    }
}

/// `/__wext/status` plus the output directory as static files.
pub fn router(out_dir: PathBuf, info: DevServerInfo) -> Router {
    let status = json!({
        "origin": info.origin(),
        "outDir": out_dir.display().to_string(),
    });
    Router::new()
        .route(
            "/__wext/status",
            get(move || {
                let status = status.clone();
                async move { Json::<Value>(status) }
            }),
        )
        .fallback_service(ServeDir::new(out_dir))
        .layer(CorsLayer::permissive())
}

/// First port from `start` (inclusive, up to `start + 10`) that `hostname`
/// can bind.
pub fn find_available_port(hostname: &str, start: u16) -> Result<u16> {
    let end = start.saturating_add(PORT_RANGE);
    (start..=end)
        .find(|port| StdListener::bind((hostname, *port)).is_ok())
        .ok_or_else(|| {
            CliError::Server(format!(
                "Ports {start}-{end} are all in use on {hostname}\n\nHint: Pass --port or set dev.port in wext.toml"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_a_busy_port() {
        let Ok(busy) = StdListener::bind(("127.0.0.1", 0)) else {
            eprintln!("Skipping: unable to bind a socket");
            return;
        };
        let port = busy.local_addr().unwrap().port();
        if port > u16::MAX - PORT_RANGE {
            return;
        }

        let found = find_available_port("127.0.0.1", port).unwrap();
        assert!(found > port && found <= port + PORT_RANGE);
    }

    #[tokio::test]
    async fn binds_the_requested_port() {
        let Ok(port) = find_available_port("127.0.0.1", 3400) else {
            return;
        };
        let server = DevServer::bind(DevServerInfo::new("127.0.0.1", port), PathBuf::from("."))
            .await
            .unwrap();
        assert_eq!(server.info().origin(), format!("http://127.0.0.1:{port}"));

        let err = DevServer::bind(DevServerInfo::new("127.0.0.1", port), PathBuf::from("."))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to bind"));
    }
}
