//! Dependency resolution for watch-mode registration.
//!
//! Two mutually exclusive strategies, picked by whether `cwd` is configured:
//!
//! | Strategy   | Source                         | Registers                     |
//! |------------|--------------------------------|-------------------------------|
//! | `Manifest` | `<cwd>/elm.json`               | manifest file + source dirs   |
//! | `Query`    | compiler dependency query      | each dependency file          |
//!
//! In manifest mode the source directories are additionally deep-scanned
//! when the compiler cannot answer dependency queries itself.

mod cache;
pub mod imports;
mod manifest;
mod scan;

pub use cache::DependencyCache;
pub use manifest::{MANIFEST_NAME, Manifest, ManifestSources, clean_join, read_manifest};
pub use scan::collect_sources;

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::compiler::Compiler;
use crate::error::{LoaderError, Result};

/// Resolved dependencies of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    /// File-level dependencies.
    pub files: FxHashSet<PathBuf>,
    /// Subtree-level dependencies: any change below them counts.
    pub directories: FxHashSet<PathBuf>,
}

impl DependencySet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len()
    }

    pub fn extend(&mut self, other: &DependencySet) {
        self.files.extend(other.files.iter().cloned());
        self.directories.extend(other.directories.iter().cloned());
    }

    /// Files in a stable order for registration.
    pub fn sorted_files(&self) -> Vec<&Path> {
        let mut files: Vec<_> = self.files.iter().map(PathBuf::as_path).collect();
        files.sort();
        files
    }

    /// Directories in a stable order for registration.
    pub fn sorted_directories(&self) -> Vec<&Path> {
        let mut dirs: Vec<_> = self.directories.iter().map(PathBuf::as_path).collect();
        dirs.sort();
        dirs
    }
}

impl From<&ManifestSources> for DependencySet {
    fn from(sources: &ManifestSources) -> Self {
        let mut set = Self::default();
        set.files.insert(sources.manifest.clone());
        set.directories.extend(sources.directories.iter().cloned());
        set
    }
}

/// How to resolve a request's dependencies.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Manifest already read; scan its directories.
    Manifest(ManifestSources),
    /// Ask the compiler about every compiled module.
    Query { entry: PathBuf, files: Vec<PathBuf> },
}

/// Resolve dependencies with the given strategy.
pub async fn resolve<C: Compiler>(compiler: Arc<C>, strategy: Strategy) -> Result<DependencySet> {
    match strategy {
        Strategy::Manifest(sources) => resolve_manifest(compiler.as_ref(), sources).await,
        Strategy::Query { entry, files } => resolve_query(compiler, &entry, files).await,
    }
}

async fn resolve_manifest<C: Compiler>(
    compiler: &C,
    sources: ManifestSources,
) -> Result<DependencySet> {
    let mut set = DependencySet::from(&sources);
    if compiler.supports_dependency_query() {
        return Ok(set);
    }

    let extensions: Vec<String> = compiler
        .source_extensions()
        .iter()
        .map(|e| e.to_string())
        .collect();
    let dirs = sources.directories;

    let scanned = tokio::task::spawn_blocking(move || {
        let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();
        dirs.iter()
            .map(|dir| collect_sources(dir, &extensions))
            .collect::<std::io::Result<Vec<_>>>()
    })
    .await
    .map_err(|e| LoaderError::Dependency(format!("source scan aborted: {e}")))?
    .map_err(|e| LoaderError::Dependency(e.to_string()))?;

    set.files.extend(scanned.into_iter().flatten());
    crate::debug!("deps"; "deep scan found {} source file(s)", set.files.len() - 1);
    Ok(set)
}

/// `unique(query(files) ∪ (files − entry))`, entry excluded.
async fn resolve_query<C: Compiler>(
    compiler: Arc<C>,
    entry: &Path,
    files: Vec<PathBuf>,
) -> Result<DependencySet> {
    let mut queries = JoinSet::new();
    for file in files.iter().cloned() {
        let compiler = Arc::clone(&compiler);
        queries.spawn(async move { compiler.find_dependencies(&file).await });
    }

    let mut set = DependencySet::default();
    while let Some(joined) = queries.join_next().await {
        let found = joined
            .map_err(|e| LoaderError::Dependency(format!("dependency query aborted: {e}")))?
            .map_err(|e| match e {
                LoaderError::Dependency(_) => e,
                other => LoaderError::Dependency(other.to_string()),
            })?;
        set.files.extend(found);
    }

    set.files.extend(files);
    set.files.remove(entry);
    Ok(set)
}
