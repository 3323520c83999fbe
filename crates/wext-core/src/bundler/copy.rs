//! Transform-free bundler.
//!
//! Copies sources to their bundle paths. Useful for plain JavaScript projects
//! and as the default when no bundler command is configured.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{BuildContext, Bundler, Chunk, bundle_path, css_bundle_path};
use crate::entrypoint::{Entrypoint, EntrypointKind};
use crate::error::{CoreError, Result};
use crate::group::EntrypointGroup;

const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "styl"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CopyBundler;

impl CopyBundler {
    pub fn new() -> Self {
        Self
    }

    async fn build_entrypoint(&self, entrypoint: &Entrypoint, ctx: &BuildContext) -> Result<Vec<Chunk>> {
        match entrypoint.kind {
            EntrypointKind::Background | EntrypointKind::UnlistedScript => {
                let file_name = bundle_path(entrypoint, ctx);
                copy_to(&entrypoint.input_path, &ctx.out_dir, &file_name).await?;
                Ok(vec![Chunk::script(file_name)])
            }
            EntrypointKind::ContentScript => {
                let file_name = bundle_path(entrypoint, ctx);
                copy_to(&entrypoint.input_path, &ctx.out_dir, &file_name).await?;
                let mut chunks = vec![Chunk::script(file_name)];

                let styles = sibling_styles(&entrypoint.input_path).await?;
                if !styles.is_empty() {
                    let css_name = css_bundle_path(entrypoint);
                    let mut css = String::new();
                    for style in &styles {
                        let text = tokio::fs::read_to_string(style)
                            .await
                            .map_err(|err| CoreError::io(style, err))?;
                        css.push_str(&text);
                        if !css.ends_with('\n') {
                            css.push('\n');
                        }
                    }
                    write_to(&ctx.out_dir, &css_name, css.as_bytes()).await?;
                    chunks.push(Chunk::asset(css_name));
                }
                Ok(chunks)
            }
            EntrypointKind::ContentScriptStyle | EntrypointKind::UnlistedStyle => {
                let file_name = css_bundle_path(entrypoint);
                copy_to(&entrypoint.input_path, &ctx.out_dir, &file_name).await?;
                Ok(vec![Chunk::asset(file_name)])
            }
            EntrypointKind::Popup
            | EntrypointKind::Options
            | EntrypointKind::Devtools
            | EntrypointKind::Newtab
            | EntrypointKind::Sidepanel
            | EntrypointKind::Sandbox
            | EntrypointKind::Bookmarks
            | EntrypointKind::History
            | EntrypointKind::UnlistedPage => {
                let file_name = bundle_path(entrypoint, ctx);
                copy_to(&entrypoint.input_path, &ctx.out_dir, &file_name).await?;
                Ok(vec![Chunk::asset(file_name)])
            }
        }
    }
}

#[async_trait]
impl Bundler for CopyBundler {
    async fn build(&self, group: &EntrypointGroup, ctx: &BuildContext) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for entrypoint in group.entrypoints() {
            chunks.extend(self.build_entrypoint(entrypoint, ctx).await?);
        }
        debug!("Copied {} ({} files)", group.names(), chunks.len());
        Ok(chunks)
    }
}

/// Stylesheets next to a directory-style entry (`name.content/*.css`).
async fn sibling_styles(input: &Path) -> Result<Vec<PathBuf>> {
    let is_index = input
        .file_stem()
        .is_some_and(|stem| stem.to_string_lossy() == "index");
    let Some(dir) = input.parent().filter(|_| is_index) else {
        return Ok(Vec::new());
    };

    let mut styles = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| CoreError::io(dir, err))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| CoreError::io(dir, err))?
    {
        let path = entry.path();
        let is_style = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| STYLE_EXTENSIONS.contains(&ext));
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if is_style && !hidden && path.is_file() {
            styles.push(path);
        }
    }
    styles.sort();
    Ok(styles)
}

async fn copy_to(source: &Path, out_dir: &Path, file_name: &str) -> Result<()> {
    let target = out_dir.join(file_name);
    ensure_parent(&target).await?;
    tokio::fs::copy(source, &target)
        .await
        .map_err(|err| CoreError::io(source, err))?;
    Ok(())
}

async fn write_to(out_dir: &Path, file_name: &str, contents: &[u8]) -> Result<()> {
    let target = out_dir.join(file_name);
    ensure_parent(&target).await?;
    tokio::fs::write(&target, contents)
        .await
        .map_err(|err| CoreError::io(&target, err))
}

async fn ensure_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| CoreError::io(parent, err))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Command, ResolvedConfig, UserConfig};
    use crate::entrypoint::{BrowserFilter, EntrypointOptions, output_dir_for};
    use std::fs;

    fn setup() -> (tempfile::TempDir, BuildContext) {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ResolvedConfig::resolve(dir.path(), &UserConfig::default(), Command::Build, None)
                .unwrap();
        let ctx = BuildContext::from_config(&config);
        (dir, ctx)
    }

    fn entry(ctx: &BuildContext, name: &str, kind: EntrypointKind, input: PathBuf) -> Entrypoint {
        Entrypoint {
            name: name.into(),
            kind,
            input_path: input,
            output_dir: output_dir_for(kind, &ctx.out_dir),
            options: EntrypointOptions::default_for(kind),
            filter: BrowserFilter::default(),
        }
    }

    #[tokio::test]
    async fn content_script_directory_gets_css() {
        let (dir, ctx) = setup();
        let entry_dir = dir.path().join("entrypoints/one.content");
        fs::create_dir_all(&entry_dir).unwrap();
        fs::write(entry_dir.join("index.ts"), "console.log('one')").unwrap();
        fs::write(entry_dir.join("b.css"), "b {}").unwrap();
        fs::write(entry_dir.join("a.css"), "a {}").unwrap();

        let group = EntrypointGroup::Single(entry(
            &ctx,
            "one",
            EntrypointKind::ContentScript,
            entry_dir.join("index.ts"),
        ));
        let chunks = CopyBundler::new().build(&group, &ctx).await.unwrap();

        assert_eq!(
            chunks,
            vec![
                Chunk::script("content-scripts/one.js"),
                Chunk::asset("content-scripts/one.css"),
            ]
        );
        let css = fs::read_to_string(ctx.out_dir.join("content-scripts/one.css")).unwrap();
        assert_eq!(css, "a {}\nb {}\n");
    }

    #[tokio::test]
    async fn pages_are_copied_as_html() {
        let (dir, ctx) = setup();
        let pages = dir.path().join("entrypoints");
        fs::create_dir_all(pages.join("options")).unwrap();
        fs::write(pages.join("popup.html"), "<p>popup</p>").unwrap();
        fs::write(pages.join("options/index.html"), "<p>options</p>").unwrap();

        let group = EntrypointGroup::MultiPage(vec![
            entry(&ctx, "options", EntrypointKind::Options, pages.join("options/index.html")),
            entry(&ctx, "popup", EntrypointKind::Popup, pages.join("popup.html")),
        ]);
        let chunks = CopyBundler::new().build(&group, &ctx).await.unwrap();

        assert_eq!(chunks, vec![Chunk::asset("options.html"), Chunk::asset("popup.html")]);
        assert_eq!(
            fs::read_to_string(ctx.out_dir.join("options.html")).unwrap(),
            "<p>options</p>"
        );
    }

    #[tokio::test]
    async fn unlisted_style_goes_to_assets() {
        let (dir, ctx) = setup();
        let input = dir.path().join("entrypoints/theme.css");
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, "body {}").unwrap();

        let group =
            EntrypointGroup::Single(entry(&ctx, "theme", EntrypointKind::UnlistedStyle, input));
        let chunks = CopyBundler::new().build(&group, &ctx).await.unwrap();
        assert_eq!(chunks, vec![Chunk::asset("assets/theme.css")]);
        assert!(ctx.out_dir.join("assets/theme.css").exists());
    }

    #[tokio::test]
    async fn missing_input_is_an_io_error() {
        let (dir, ctx) = setup();
        let group = EntrypointGroup::Single(entry(
            &ctx,
            "background",
            EntrypointKind::Background,
            dir.path().join("entrypoints/background.ts"),
        ));
        let err = CopyBundler::new().build(&group, &ctx).await.unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
