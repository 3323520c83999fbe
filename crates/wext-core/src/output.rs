//! What a pipeline pass produces.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::bundler::Chunk;
use crate::error::CompatibilityWarning;
use crate::group::EntrypointGroup;

/// Result of building one group.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildStep {
    pub group: EntrypointGroup,
    pub chunks: Vec<Chunk>,
}

/// Everything one pass wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
    pub manifest: Map<String, Value>,
    /// Files copied verbatim, relative to the output directory.
    /// `manifest.json` is always first.
    pub public_assets: Vec<String>,
    pub steps: Vec<BuildStep>,
    pub warnings: Vec<CompatibilityWarning>,
    /// Input paths of every discovered entrypoint, including those whose
    /// group failed to build in dev mode.
    pub inputs: Vec<PathBuf>,
}

impl BuildOutput {
    /// All chunks of all steps, in step order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        all_chunks(&self.steps)
    }

    /// Every file the pass wrote, relative to the output directory.
    pub fn files(&self) -> Vec<&str> {
        self.public_assets
            .iter()
            .map(String::as_str)
            .chain(self.chunks().map(|c| c.file_name.as_str()))
            .collect()
    }
}

pub(crate) fn all_chunks(steps: &[BuildStep]) -> impl Iterator<Item = &Chunk> {
    steps.iter().flat_map(|step| step.chunks.iter())
}
