//! Entrypoint discovery.
//!
//! Walks the entrypoints directory in file-name order, classifies each file,
//! loads its definition, resolves options for the target browser and drops
//! entrypoints that are inactive for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::naming::{self, Classification, is_top_level};
use super::options::resolve_options;
use super::{Entrypoint, EntrypointKind, EntrypointOptions, output_dir_for};
use crate::config::ResolvedConfig;
use crate::definition::DefinitionLoader;
use crate::error::{ClassificationError, CoreError, Result};

/// All non-hidden files under `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn scan_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            CoreError::io(path, err.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Discover the active entrypoints for the configured target.
///
/// # Errors
///
/// - a root-level file that matches no naming rule
/// - a definition that fails to load or has malformed options
/// - an entrypoint setting both `include` and `exclude`
/// - two entrypoints of a singleton kind after filtering
pub async fn discover(
    config: &ResolvedConfig,
    loader: &dyn DefinitionLoader,
) -> Result<Vec<Entrypoint>> {
    let files = scan_files(&config.entrypoints_dir)?;
    if files.is_empty() {
        warn!(
            "No entrypoints found in {}",
            config.relative_to_root(&config.entrypoints_dir).display()
        );
    }

    let mut entrypoints = Vec::new();
    for path in files {
        let Some(Classification { name, kind }) = classify_or_skip(config, &path)? else {
            continue;
        };

        let relative = config.relative_to_root(&path);
        let definition = loader
            .load(&path, kind)
            .await
            .map_err(|err| CoreError::Definition {
                path: relative.clone(),
                message: err.to_string(),
            })?;
        let (options, filter) =
            resolve_options(kind, &definition, &config.browser).map_err(|err| {
                CoreError::Definition {
                    path: relative.clone(),
                    message: err.to_string(),
                }
            })?;

        // Conflicting filters are fatal even when the entrypoint would be
        // dropped for this target.
        if !filter.is_active(&config.browser, &relative)? {
            debug!("{} is not active for {}", relative.display(), config.browser);
            continue;
        }

        if let Some(allowed) = &config.filter_entrypoints {
            if !allowed.contains(&name) {
                debug!("{} filtered out by filterEntrypoints", relative.display());
                continue;
            }
        }

        if let EntrypointOptions::ContentScript(script) = &options {
            if script.matches.is_empty() {
                warn!("Content script {} has no matches", relative.display());
            }
        }

        entrypoints.push(Entrypoint {
            name,
            kind,
            output_dir: output_dir_for(kind, &config.out_dir),
            input_path: path,
            options,
            filter,
        });
    }

    check_singletons(config, &entrypoints)?;
    debug!("Discovered {} entrypoints", entrypoints.len());
    Ok(entrypoints)
}

/// Root-level classification failures are fatal; nested ones are reported and
/// the file is skipped.
fn classify_or_skip(config: &ResolvedConfig, path: &Path) -> Result<Option<Classification>> {
    match naming::classify(config, path) {
        Ok(found) => Ok(found),
        Err(err) if is_top_level(&config.entrypoints_dir, path) => Err(err.into()),
        Err(err) => {
            warn!("{err}");
            Ok(None)
        }
    }
}

fn check_singletons(config: &ResolvedConfig, entrypoints: &[Entrypoint]) -> Result<()> {
    let mut seen: HashMap<EntrypointKind, &Path> = HashMap::new();
    for entrypoint in entrypoints.iter().filter(|e| e.kind.is_singleton()) {
        if let Some(first) = seen.insert(entrypoint.kind, entrypoint.input_path.as_path()) {
            return Err(ClassificationError::DuplicateSingleton {
                kind: entrypoint.kind,
                first: config.relative_to_root(first),
                second: config.relative_to_root(&entrypoint.input_path),
            }
            .into());
        }
    }
    Ok(())
}
