//! Per-invocation request value.

use std::path::{Path, PathBuf};

use crate::compiler::CompileJob;
use crate::config::EffectiveConfig;

/// Immutable description of one loader call.
#[derive(Debug, Clone)]
pub struct CompilationRequest {
    /// Module the host asked for.
    pub entry: PathBuf,
    /// Modules handed to the compiler.
    pub files: Vec<PathBuf>,
    pub config: EffectiveConfig,
    /// Whether this call runs in an incremental session.
    pub watch: bool,
}

impl CompilationRequest {
    /// Working directory for manifest-mode resolution and the compiler.
    pub fn cwd(&self) -> Option<&Path> {
        self.config.loader().cwd.as_deref()
    }

    /// Compiler job for this request.
    pub fn job(&self) -> CompileJob {
        CompileJob {
            files: self.files.clone(),
            options: self.config.compiler_options().clone(),
            cwd: self.cwd().map(Path::to_path_buf),
        }
    }
}
