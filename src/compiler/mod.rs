//! External compiler integration.
//!
//! - `admission`: concurrency ceiling on running compiler processes
//! - `flags`: compiler-facing options → command-line flags
//! - `elm`: process-backed `Compiler` implementation
//! - `invoke`: one admitted compilation with error normalization

mod admission;
mod elm;
mod flags;
mod invoke;

pub use admission::{Admission, AdmissionToken};
pub use elm::ElmCompiler;
pub use flags::CompilerFlags;
pub use invoke::{TRAILER, invoke, with_trailer};

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::config::OptionMap;
use crate::error::Result;
use crate::loader::Emitter;

/// Source extensions recognized by deep directory scans.
pub const SOURCE_EXTENSIONS: &[&str] = &["elm"];

/// One compilation handed to the external compiler.
#[derive(Debug, Clone, Default)]
pub struct CompileJob {
    /// Modules to compile, in order.
    pub files: Vec<PathBuf>,
    /// Compiler-facing options (private keys already stripped).
    pub options: OptionMap,
    /// Working directory of the compiler process.
    pub cwd: Option<PathBuf>,
}

/// Black-box external compiler.
///
/// Implementations are shared across concurrent requests, so they must be
/// `Send + Sync` and must not rely on per-request mutable state.
pub trait Compiler: Send + Sync + 'static {
    /// Compile a job and return the artifact text without the trailer.
    ///
    /// Compiler-side diagnostics that are not failures go to `emitter`.
    fn compile(
        &self,
        job: &CompileJob,
        emitter: &Emitter,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Transitive dependencies of one module, possibly including itself.
    fn find_dependencies(&self, file: &Path) -> impl Future<Output = Result<Vec<PathBuf>>> + Send;

    /// Whether `find_dependencies` is backed by the compiler.
    ///
    /// When false, manifest-mode resolution deep-scans source directories.
    fn supports_dependency_query(&self) -> bool {
        true
    }

    /// Extensions of source files for deep scans.
    fn source_extensions(&self) -> &[&str] {
        SOURCE_EXTENSIONS
    }
}
