//! Grouping entrypoints into build units.

use std::path::{Path, PathBuf};

use crate::entrypoint::Entrypoint;

/// Identity of a group across passes: its member input paths, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<PathBuf>);

/// One unit handed to the bundler.
#[derive(Debug, Clone, PartialEq)]
pub enum EntrypointGroup {
    /// A self-contained script or stylesheet build
    Single(Entrypoint),
    /// All HTML pages, built together so they can share chunks
    MultiPage(Vec<Entrypoint>),
}

impl EntrypointGroup {
    pub fn entrypoints(&self) -> &[Entrypoint] {
        match self {
            EntrypointGroup::Single(entrypoint) => std::slice::from_ref(entrypoint),
            EntrypointGroup::MultiPage(entrypoints) => entrypoints,
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey(
            self.entrypoints()
                .iter()
                .map(|e| e.input_path.clone())
                .collect(),
        )
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entrypoints().iter().any(|e| e.input_path == path)
    }

    /// Entrypoint names joined with `, ` (for progress output).
    pub fn names(&self) -> String {
        self.entrypoints()
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Member paths relative to `root`, joined with `, ` (for errors).
    pub fn describe(&self, root: &Path) -> String {
        self.entrypoints()
            .iter()
            .map(|e| {
                e.input_path
                    .strip_prefix(root)
                    .unwrap_or(&e.input_path)
                    .display()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Partition entrypoints into build groups, preserving discovery order.
///
/// HTML pages share one multi-page group placed where the first page
/// appeared; every other entrypoint is built on its own.
pub fn group_entrypoints(entrypoints: Vec<Entrypoint>) -> Vec<EntrypointGroup> {
    let mut groups = Vec::with_capacity(entrypoints.len());
    let mut pages_at: Option<usize> = None;

    for entrypoint in entrypoints {
        if !entrypoint.kind.is_html_page() {
            groups.push(EntrypointGroup::Single(entrypoint));
            continue;
        }
        match pages_at {
            Some(index) => {
                if let Some(EntrypointGroup::MultiPage(pages)) = groups.get_mut(index) {
                    pages.push(entrypoint);
                }
            }
            None => {
                pages_at = Some(groups.len());
                groups.push(EntrypointGroup::MultiPage(vec![entrypoint]));
            }
        }
    }

    groups
}
