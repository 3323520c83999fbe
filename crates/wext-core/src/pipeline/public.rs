use std::path::Path;

use crate::config::ResolvedConfig;
use crate::entrypoint::discovery::scan_files;
use crate::entrypoint::normalize_path;
use crate::error::{CoreError, Result};

/// Copy `public/` into the output directory.
///
/// Returns the copied files relative to the output directory, sorted.
pub async fn copy_public_dir(config: &ResolvedConfig) -> Result<Vec<String>> {
    let files = scan_files(&config.public_dir)?;
    let mut copied = Vec::with_capacity(files.len());

    for file in files {
        let Ok(relative) = file.strip_prefix(&config.public_dir) else {
            continue;
        };
        let target = config.out_dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| CoreError::io(parent, err))?;
        }
        tokio::fs::copy(&file, &target)
            .await
            .map_err(|err| CoreError::io(&file, err))?;
        copied.push(normalize_path(relative));
    }

    copied.sort();
    Ok(copied)
}

/// Whether `path` lives in the public directory.
pub fn is_public(config: &ResolvedConfig, path: &Path) -> bool {
    path.starts_with(&config.public_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Command, UserConfig};
    use std::fs;

    #[tokio::test]
    async fn copies_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ResolvedConfig::resolve(dir.path(), &UserConfig::default(), Command::Build, None)
                .unwrap();
        fs::create_dir_all(config.public_dir.join("icon")).unwrap();
        fs::write(config.public_dir.join("icon/16.png"), [0u8; 4]).unwrap();
        fs::write(config.public_dir.join("robots.txt"), "hi").unwrap();
        fs::write(config.public_dir.join(".DS_Store"), "").unwrap();

        let copied = copy_public_dir(&config).await.unwrap();
        assert_eq!(copied, vec!["icon/16.png".to_string(), "robots.txt".to_string()]);
        assert!(config.out_dir.join("icon/16.png").exists());
        assert!(is_public(&config, &config.public_dir.join("robots.txt")));
    }

    #[tokio::test]
    async fn missing_public_dir_copies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ResolvedConfig::resolve(dir.path(), &UserConfig::default(), Command::Build, None)
                .unwrap();
        assert!(copy_public_dir(&config).await.unwrap().is_empty());
    }
}
