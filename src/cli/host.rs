//! Command-line host: one context per entry and build.

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::core::BuildMode;
use crate::loader::LoaderContext;

/// Host context for one entry module.
///
/// Registered dependencies become the watch set of the next round.
#[derive(Debug, Clone)]
pub struct HostContext {
    entry: PathBuf,
    mode: BuildMode,
    watching: bool,
    query: Option<String>,
    pub files: FxHashSet<PathBuf>,
    pub dirs: FxHashSet<PathBuf>,
    pub warnings: usize,
    pub errors: usize,
}

impl HostContext {
    pub fn new(entry: PathBuf, mode: BuildMode, watching: bool, query: Option<String>) -> Self {
        Self {
            entry,
            mode,
            watching,
            query,
            files: FxHashSet::default(),
            dirs: FxHashSet::default(),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }
}

impl LoaderContext for HostContext {
    fn resource_path(&self) -> &Path {
        &self.entry
    }

    fn host_watching(&self) -> bool {
        self.watching
    }

    fn mode(&self) -> Option<BuildMode> {
        Some(self.mode)
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn add_dependency(&mut self, path: &Path) {
        self.files.insert(path.to_path_buf());
    }

    fn add_context_dependency(&mut self, path: &Path) {
        self.dirs.insert(path.to_path_buf());
    }

    fn emit_warning(&mut self, message: String) {
        self.warnings += 1;
        crate::log!("warning"; "{}", message);
    }

    fn emit_error(&mut self, message: String) {
        self.errors += 1;
        crate::log!("error"; "{}", message);
    }
}
