//! `wext build`: one production pass.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use wext_core::{BuildProgress, Command, ResolvedConfig};

use super::{create_pipeline, output_sizes, report_warnings, resolve_root};
use crate::cli::BuildArgs;
use crate::config::load_config;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// 1. Load configuration (CLI > env > wext.toml > package.json > defaults)
/// 2. Run the pipeline into a cleared output directory
/// 3. Print warnings and the output summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let root = resolve_root(&args.target.root)?;
    let user = load_config(&root, &args.target.overrides())?;
    let config = ResolvedConfig::resolve(&root, &user, Command::Build, None)?;
    debug!("Resolved configuration: {config:?}");

    ui::info(&format!(
        "Building {} in {} mode",
        config.target(),
        config.mode
    ));

    let out_dir = config.out_dir.clone();
    let relative_out_dir = config.relative_to_root(&out_dir);
    let spinner = Arc::new(ui::Spinner::new("Discovering entrypoints..."));
    let progress = Arc::clone(&spinner);
    let pipeline = create_pipeline(config, &user).with_progress(Arc::new(
        move |step: &BuildProgress| progress.set_message(&format!("Building {step}")),
    ));

    let output = match pipeline.build().await {
        Ok(output) => {
            spinner.finish("Build complete");
            output
        }
        Err(err) => {
            spinner.fail("Build failed");
            return Err(err.into());
        }
    };

    report_warnings(&output);
    ui::print_build_summary(
        &relative_out_dir.display().to_string(),
        &output_sizes(&out_dir, &output),
    );
    ui::success(&format!(
        "Built extension in {}",
        ui::format_duration(start.elapsed())
    ));
    Ok(())
}
