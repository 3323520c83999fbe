//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;
use wext_core::definition::LoadError;
use wext_core::{
    BuildContext, Bundler, Chunk, Command, CopyBundler, DefaultLoader, DefinitionLoader,
    DevServerInfo, EntrypointGroup, EntrypointKind, Pipeline, ResolvedConfig, UserConfig,
};

/// A throwaway extension project.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        project.write(
            "package.json",
            r#"{ "name": "demo", "description": "A demo extension", "version": "1.2.3-beta1" }"#,
        );
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn config(&self, user: UserConfig, command: Command) -> ResolvedConfig {
        let server = match command {
            Command::Serve => Some(DevServerInfo::new("localhost", 3000)),
            Command::Build => None,
        };
        ResolvedConfig::resolve(self.root(), &user, command, server).unwrap()
    }

    pub fn browser(browser: &str) -> UserConfig {
        UserConfig {
            browser: Some(browser.to_string()),
            ..Default::default()
        }
    }
}

/// Definitions keyed by a path suffix (`one.content/index.ts`); everything
/// else falls back to the default loader.
#[derive(Debug, Default)]
pub struct StaticLoader {
    definitions: BTreeMap<String, Value>,
    fallback: DefaultLoader,
}

impl StaticLoader {
    pub fn with(mut self, file: &str, definition: Value) -> Self {
        self.definitions.insert(file.to_string(), definition);
        self
    }

    /// A content script definition matching `patterns`.
    pub fn matching(self, file: &str, patterns: &[&str]) -> Self {
        self.with(file, json!({ "matches": patterns }))
    }
}

#[async_trait]
impl DefinitionLoader for StaticLoader {
    async fn load(&self, path: &Path, kind: EntrypointKind) -> Result<Value, LoadError> {
        let found = self
            .definitions
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()));
        match found {
            Some((_, definition)) => Ok(definition.clone()),
            None => self.fallback.load(path, kind).await,
        }
    }
}

/// Copy bundler that records every group it builds and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingBundler {
    inner: CopyBundler,
    pub calls: Mutex<Vec<String>>,
    pub failing: Mutex<BTreeSet<String>>,
}

impl RecordingBundler {
    pub fn fail(&self, names: &str) {
        self.failing.lock().insert(names.to_string());
    }

    pub fn recover(&self, names: &str) {
        self.failing.lock().remove(names);
    }

    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock())
    }
}

#[async_trait]
impl Bundler for RecordingBundler {
    async fn build(
        &self,
        group: &EntrypointGroup,
        ctx: &BuildContext,
    ) -> wext_core::Result<Vec<Chunk>> {
        let names = group.names();
        self.calls.lock().push(names.clone());
        if self.failing.lock().contains(&names) {
            return Err(wext_core::BuildError {
                group: names,
                message: "Unexpected token".into(),
            }
            .into());
        }
        self.inner.build(group, ctx).await
    }
}

pub fn pipeline(
    config: ResolvedConfig,
    loader: StaticLoader,
    bundler: Arc<RecordingBundler>,
) -> Pipeline {
    Pipeline::new(Arc::new(config), Arc::new(loader), bundler)
}

pub fn read_manifest(config: &ResolvedConfig) -> Value {
    let text = fs::read_to_string(config.out_dir.join("manifest.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}
