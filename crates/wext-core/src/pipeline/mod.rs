//! Pipeline orchestration.
//!
//! A pass runs discovery, grouping, one bundler call per group, public asset
//! copying, manifest assembly and the manifest write. [`Pipeline::build`] is a
//! full pass into a cleared output directory. [`Pipeline::rebuild`] is the dev
//! mode pass: it keeps the output directory, reuses the steps of untouched
//! groups and tolerates bundler failures.

mod public;
mod queue;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

pub use public::{copy_public_dir, is_public};
pub use queue::ChangeQueue;

use crate::bundler::{BuildContext, Bundler, Chunk};
use crate::config::ResolvedConfig;
use crate::definition::DefinitionLoader;
use crate::entrypoint::{Entrypoint, discover};
use crate::error::{BuildError, CoreError, Result};
use crate::group::{EntrypointGroup, GroupKey, group_entrypoints};
use crate::manifest::{ManifestAssembler, write_manifest};
use crate::output::{BuildOutput, BuildStep};
use crate::package::PackageMetadata;

/// Where a pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Discovering,
    Building,
    Assembling,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Discovering => "discovering",
            PipelineState::Building => "building",
            PipelineState::Assembling => "assembling",
            PipelineState::Writing => "writing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress of the build phase, reported before each group is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProgress {
    /// 1-based
    pub index: usize,
    pub total: usize,
    /// Entrypoint names of the group
    pub names: String,
}

impl fmt::Display for BuildProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.index, self.total, self.names)
    }
}

pub type ProgressCallback = Arc<dyn Fn(&BuildProgress) + Send + Sync>;

/// The extension build pipeline for one target.
pub struct Pipeline {
    config: Arc<ResolvedConfig>,
    loader: Arc<dyn DefinitionLoader>,
    bundler: Arc<dyn Bundler>,
    assembler: ManifestAssembler,
    state: RwLock<PipelineState>,
    on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("target", &self.config.target())
            .field("loader", &self.loader)
            .field("bundler", &self.bundler)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        config: Arc<ResolvedConfig>,
        loader: Arc<dyn DefinitionLoader>,
        bundler: Arc<dyn Bundler>,
    ) -> Self {
        Self {
            config,
            loader,
            bundler,
            assembler: ManifestAssembler::default(),
            state: RwLock::new(PipelineState::Idle),
            on_progress: None,
        }
    }

    /// Replace the default manifest assembler.
    pub fn with_assembler(mut self, assembler: ManifestAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Called before each group is built.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        *self.state.read()
    }

    fn set_state(&self, next: PipelineState) {
        let mut state = self.state.write();
        debug!("Pipeline {} -> {}", *state, next);
        *state = next;
    }

    /// Full pass into a freshly cleared output directory.
    ///
    /// In production any bundler failure aborts the pass. In dev mode a
    /// failing group is logged and left out, so the dev session can start.
    pub async fn build(&self) -> Result<BuildOutput> {
        let result = self.run_full().await;
        self.finish(result)
    }

    /// Dev mode pass after `changed` paths were modified.
    ///
    /// Groups that match a step of `previous` and contain none of the changed
    /// files keep that step. A group that fails to build keeps its previous
    /// step, if any, and the pass goes on. When the set of entrypoints changed
    /// every group is rebuilt.
    pub async fn rebuild(&self, changed: &[PathBuf], previous: &BuildOutput) -> Result<BuildOutput> {
        let result = self.run_incremental(changed, previous).await;
        self.finish(result)
    }

    fn finish(&self, result: Result<BuildOutput>) -> Result<BuildOutput> {
        match &result {
            Ok(_) => self.set_state(PipelineState::Done),
            Err(_) => self.set_state(PipelineState::Failed),
        }
        result
    }

    async fn run_full(&self) -> Result<BuildOutput> {
        let config = &self.config;
        clear_dir(&config.out_dir).await?;

        let (entrypoints, groups) = self.discover_groups().await?;

        self.set_state(PipelineState::Building);
        let ctx = BuildContext::from_config(config);
        let total = groups.len();
        let mut steps = Vec::with_capacity(total);
        for (i, group) in groups.into_iter().enumerate() {
            self.report(i + 1, total, &group);
            match self.build_group(&group, &ctx).await {
                Ok(chunks) => steps.push(BuildStep { group, chunks }),
                Err(err) if config.is_dev() => warn!("{err}"),
                Err(err) => return Err(err),
            }
        }

        self.finish_pass(&entrypoints, steps).await
    }

    async fn run_incremental(&self, changed: &[PathBuf], previous: &BuildOutput) -> Result<BuildOutput> {
        let config = &self.config;
        let (entrypoints, groups) = self.discover_groups().await?;

        let previous_inputs: BTreeSet<&Path> =
            previous.inputs.iter().map(PathBuf::as_path).collect();
        let current_inputs: BTreeSet<&Path> =
            entrypoints.iter().map(|e| e.input_path.as_path()).collect();
        let structural = previous_inputs != current_inputs;
        let unknown_dependency = changed
            .iter()
            .any(|path| !path.starts_with(&config.entrypoints_dir) && !is_public(config, path));
        if structural {
            info!("Entrypoints changed, rebuilding every group");
        }

        let mut previous_steps: HashMap<GroupKey, &BuildStep> = previous
            .steps
            .iter()
            .map(|step| (step.group.key(), step))
            .collect();

        self.set_state(PipelineState::Building);
        let ctx = BuildContext::from_config(config);
        let total = groups.len();
        let mut steps = Vec::with_capacity(total);
        for (i, group) in groups.into_iter().enumerate() {
            let last_good = previous_steps.remove(&group.key());
            let affected = structural
                || unknown_dependency
                || last_good.is_none()
                || changed
                    .iter()
                    .any(|path| affects(config, group.entrypoints(), path));

            if let Some(step) = last_good.filter(|_| !affected) {
                debug!("Reusing previous build of {}", group.names());
                steps.push(step.clone());
                continue;
            }

            self.report(i + 1, total, &group);
            match self.build_group(&group, &ctx).await {
                Ok(chunks) => steps.push(BuildStep { group, chunks }),
                Err(err) => {
                    warn!("{err}");
                    if let Some(step) = last_good {
                        warn!("Keeping last successful build of {}", group.names());
                        steps.push(step.clone());
                    }
                }
            }
        }

        self.finish_pass(&entrypoints, steps).await
    }

    async fn discover_groups(&self) -> Result<(Vec<Entrypoint>, Vec<EntrypointGroup>)> {
        self.set_state(PipelineState::Discovering);
        let entrypoints = discover(&self.config, self.loader.as_ref()).await?;
        let groups = group_entrypoints(entrypoints.clone());
        debug!(
            "{} entrypoints in {} groups",
            entrypoints.len(),
            groups.len()
        );
        Ok((entrypoints, groups))
    }

    async fn build_group(&self, group: &EntrypointGroup, ctx: &BuildContext) -> Result<Vec<Chunk>> {
        self.bundler.build(group, ctx).await.map_err(|err| match err {
            CoreError::Build(err) => CoreError::Build(err),
            other => BuildError {
                group: group.describe(&self.config.root),
                message: other.to_string(),
            }
            .into(),
        })
    }

    async fn finish_pass(&self, entrypoints: &[Entrypoint], steps: Vec<BuildStep>) -> Result<BuildOutput> {
        let config = &self.config;
        if let Some(conflict) = find_output_conflict(config, &steps) {
            if !config.is_dev() {
                return Err(conflict.into());
            }
            warn!("{conflict}");
        }
        let mut public_assets = copy_public_dir(config).await?;

        // Groups that failed in dev mode have no output to reference.
        let built: BTreeSet<&Path> = steps
            .iter()
            .flat_map(|step| step.group.entrypoints())
            .map(|e| e.input_path.as_path())
            .collect();
        let manifest_entrypoints: Vec<Entrypoint> = entrypoints
            .iter()
            .filter(|e| built.contains(e.input_path.as_path()))
            .cloned()
            .collect();

        self.set_state(PipelineState::Assembling);
        let package = PackageMetadata::read(&config.root).await?;
        let assembled = self
            .assembler
            .assemble(config, &package, &manifest_entrypoints, &steps)?;

        self.set_state(PipelineState::Writing);
        write_manifest(config, &assembled.manifest).await?;
        public_assets.insert(0, "manifest.json".to_string());

        let output = BuildOutput {
            manifest: assembled.manifest,
            public_assets,
            steps,
            warnings: assembled.warnings,
            inputs: entrypoints.iter().map(|e| e.input_path.clone()).collect(),
        };
        info!(
            "Built {} ({} files) into {}",
            config.target(),
            output.files().len(),
            config.relative_to_root(&config.out_dir).display()
        );
        Ok(output)
    }

    fn report(&self, index: usize, total: usize, group: &EntrypointGroup) {
        let progress = BuildProgress {
            index,
            total,
            names: group.names(),
        };
        debug!("{progress}");
        if let Some(callback) = &self.on_progress {
            callback(&progress);
        }
    }
}

/// Whether a change to `path` requires rebuilding a group made of `entrypoints`.
fn affects(config: &ResolvedConfig, entrypoints: &[Entrypoint], path: &Path) -> bool {
    entrypoints.iter().any(|entrypoint| {
        if entrypoint.input_path == path {
            return true;
        }
        // Files inside `name.kind/` belong to the directory-style entrypoint.
        let Some(dir) = entrypoint.input_path.parent() else {
            return false;
        };
        dir != config.entrypoints_dir && path.starts_with(dir)
    })
}

/// The first output file written by two different groups.
fn find_output_conflict(config: &ResolvedConfig, steps: &[BuildStep]) -> Option<BuildError> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    for (index, step) in steps.iter().enumerate() {
        for chunk in &step.chunks {
            let owner = *owners.entry(chunk.file_name.as_str()).or_insert(index);
            if owner != index {
                return Some(BuildError {
                    group: format!(
                        "{} and {}",
                        steps[owner].group.describe(&config.root),
                        step.group.describe(&config.root)
                    ),
                    message: format!("both groups write `{}`", chunk.file_name),
                });
            }
        }
    }
    None
}

async fn clear_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(CoreError::io(dir, err)),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| CoreError::io(dir, err))
}

/// Run dev mode passes until `queue` is closed.
///
/// Each batch taken from the queue becomes one [`Pipeline::rebuild`]; changes
/// queued while a pass runs are merged into the next batch. `on_pass` sees
/// every pass result. Returns the last successful output.
pub async fn run_dev_loop<F>(
    pipeline: &Pipeline,
    queue: &ChangeQueue,
    initial: BuildOutput,
    mut on_pass: F,
) -> BuildOutput
where
    F: FnMut(&[PathBuf], &Result<BuildOutput>),
{
    let mut last = initial;
    while let Some(batch) = queue.next_batch().await {
        debug!("Rebuilding for {} changed files", batch.len());
        let result = pipeline.rebuild(&batch, &last).await;
        on_pass(&batch, &result);
        match result {
            Ok(output) => last = output,
            Err(err) => warn!("Dev build failed: {err}"),
        }
    }
    last
}
