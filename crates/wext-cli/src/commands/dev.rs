//! `wext dev`: initial build, then incremental rebuilds on change.
//!
//! The watcher feeds a channel; a forwarding task moves changes into the
//! pipeline's change queue, and the dev loop turns each batch queued so far
//! into one rebuild. Ctrl+C closes the queue and stops the server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::debug;
use wext_core::{ChangeQueue, Command, DevServerInfo, ResolvedConfig, run_dev_loop};

use super::{create_pipeline, report_warnings, resolve_root};
use crate::cli::DevArgs;
use crate::config::load_config;
use crate::dev::{DEFAULT_PORT, DevServer, FileWatcher, find_available_port};
use crate::error::{Result, ResultExt};
use crate::ui;

const DEFAULT_HOSTNAME: &str = "localhost";
const DEBOUNCE: Duration = Duration::from_millis(50);

/// Execute the dev command.
pub async fn execute(args: DevArgs) -> Result<()> {
    let root = resolve_root(&args.target.root)?;
    let user = load_config(&root, &args.overrides())?;

    let hostname = user
        .dev
        .hostname
        .clone()
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());
    let port = match user.dev.port {
        Some(port) => port,
        None => find_available_port(&hostname, DEFAULT_PORT)?,
    };
    let server_info = DevServerInfo::new(hostname, port);

    let config = ResolvedConfig::resolve(&root, &user, Command::Serve, Some(server_info.clone()))?;
    debug!("Resolved configuration: {config:?}");
    ui::info(&format!("Starting dev mode for {}", config.target()));

    let out_dir = config.out_dir.clone();
    let ignored = vec![config.out_base_dir.clone()];
    let pipeline = create_pipeline(config, &user);

    let initial = pipeline.build().await?;
    report_warnings(&initial);
    ui::success(&format!(
        "Built {} files into {}",
        initial.files().len(),
        out_dir.display()
    ));

    let server = DevServer::bind(server_info.clone(), out_dir)
        .await
        .with_hint("Pass --port or set dev.port in wext.toml")?;
    let mut server_task = tokio::spawn(server.run());
    ui::success(&format!("Dev server running at {}", server_info.origin()));

    let (watcher, mut changes) = FileWatcher::new(root, ignored, DEBOUNCE)?;
    ui::info(&format!("Watching {}", watcher.root().display()));

    let queue = Arc::new(ChangeQueue::new());
    let forward = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                queue.push([change.path().to_path_buf()]);
            }
            queue.close();
        })
    };

    ui::info("Press Ctrl+C to stop");
    let dev_loop = run_dev_loop(&pipeline, &queue, initial, report_pass);

    tokio::select! {
        _ = dev_loop => {}
        _ = signal::ctrl_c() => {
            ui::info("Shutting down...");
            queue.close();
        }
        result = &mut server_task => {
            if let Ok(Err(err)) = result {
                ui::error(&err.to_string());
            }
        }
    }

    forward.abort();
    server_task.abort();
    drop(watcher);
    ui::success("Dev mode stopped");
    Ok(())
}

fn report_pass(batch: &[PathBuf], result: &wext_core::Result<wext_core::BuildOutput>) {
    let changed = match batch {
        [single] => single.display().to_string(),
        _ => format!("{} files", batch.len()),
    };
    match result {
        Ok(output) => {
            report_warnings(output);
            ui::success(&format!("Rebuilt after changes to {changed}"));
        }
        Err(err) => ui::error(&format!("Rebuild failed: {err}")),
    }
}
