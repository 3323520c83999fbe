//! Definition loaders.
//!
//! An entrypoint's options live in its definition object. How that object is
//! obtained depends on the file: HTML pages declare options with
//! `<meta name="manifest.<key>" content="...">` tags, scripts need an
//! external evaluator, styles have none. The pipeline only sees the
//! [`DefinitionLoader`] trait.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entrypoint::EntrypointKind;
use crate::process::run_json;

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta tag regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

/// Failure to load a definition object.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Command(String),

    #[error("definition must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// Produces the evaluated definition object of an entrypoint.
#[async_trait]
pub trait DefinitionLoader: Send + Sync + fmt::Debug {
    /// Load the definition of the entrypoint at `path` (absolute).
    ///
    /// Returns a JSON object, possibly empty.
    async fn load(&self, path: &Path, kind: EntrypointKind) -> Result<Value, LoadError>;
}

/// Reads `manifest.*` meta tags from HTML entrypoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMetaLoader;

impl HtmlMetaLoader {
    /// Definition object declared by the meta tags of `html`.
    pub fn parse(html: &str) -> Map<String, Value> {
        let mut definition = Map::new();

        for tag in META_TAG.find_iter(html) {
            let mut name = None;
            let mut content = None;
            for attr in ATTRIBUTE.captures_iter(tag.as_str()) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map_or("", |m| m.as_str());
                match attr[1].to_ascii_lowercase().as_str() {
                    "name" => name = Some(value.to_string()),
                    "content" => content = Some(decode_entities(value)),
                    _ => {}
                }
            }

            let (Some(name), Some(content)) = (name, content) else {
                continue;
            };
            let Some(key) = name.strip_prefix("manifest.") else {
                continue;
            };

            let value = serde_json::from_str(&content).unwrap_or(Value::String(content));
            definition.insert(camel_case(key), value);
        }

        definition
    }
}

#[async_trait]
impl DefinitionLoader for HtmlMetaLoader {
    async fn load(&self, path: &Path, _kind: EntrypointKind) -> Result<Value, LoadError> {
        let html = tokio::fs::read_to_string(path).await?;
        Ok(Value::Object(Self::parse(&html)))
    }
}

#[derive(Serialize)]
struct LoadRequest<'a> {
    path: &'a Path,
    kind: EntrypointKind,
}

/// Asks an external program for the definition.
///
/// The program receives `{"path": "...", "kind": "..."}` on stdin and prints
/// the definition object on stdout.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandLoader {
    pub fn new(command: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command,
            cwd: cwd.into(),
        }
    }
}

#[async_trait]
impl DefinitionLoader for CommandLoader {
    async fn load(&self, path: &Path, kind: EntrypointKind) -> Result<Value, LoadError> {
        let request = LoadRequest { path, kind };
        let value: Value = run_json(&self.command, &self.cwd, &request)
            .await
            .map_err(LoadError::Command)?;
        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            other => Err(LoadError::NotAnObject(other.to_string())),
        }
    }
}

/// HTML through meta tags, scripts through the command loader when one is
/// configured, everything else empty.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoader {
    scripts: Option<CommandLoader>,
}

impl DefaultLoader {
    pub fn new(scripts: Option<CommandLoader>) -> Self {
        Self { scripts }
    }
}

#[async_trait]
impl DefinitionLoader for DefaultLoader {
    async fn load(&self, path: &Path, kind: EntrypointKind) -> Result<Value, LoadError> {
        if kind.is_html_page() {
            return HtmlMetaLoader.load(path, kind).await;
        }
        match (&self.scripts, kind.is_style()) {
            (Some(loader), false) => loader.load(path, kind).await,
            _ => Ok(Value::Object(Map::new())),
        }
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
