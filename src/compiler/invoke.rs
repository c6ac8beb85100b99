//! One admitted compilation.

use std::sync::Arc;

use super::{Admission, CompileJob, Compiler};
use crate::error::{LoaderError, Result};
use crate::loader::Emitter;

/// Line appended to every artifact so the host module system can import it.
pub const TRAILER: &str = "module.exports = this.Elm;";

/// Append the re-export trailer, separated by a single newline.
pub fn with_trailer(mut artifact: String) -> String {
    artifact.reserve(TRAILER.len() + 1);
    artifact.push('\n');
    artifact.push_str(TRAILER);
    artifact
}

/// Wait for admission, compile, and normalize the outcome.
///
/// The token is held for the whole compilation and released on every exit
/// path, including failures.
pub async fn invoke<C: Compiler>(
    compiler: &C,
    admission: &Arc<Admission>,
    max_instances: usize,
    job: &CompileJob,
    emitter: &Emitter,
) -> Result<String> {
    let _token = admission.admit(max_instances).await;
    crate::debug!("compile"; "compiling {} module(s)", job.files.len());

    match compiler.compile(job, emitter).await {
        Ok(artifact) => Ok(with_trailer(artifact)),
        Err(LoaderError::Compiler(message)) => Err(LoaderError::compiler(message)),
        Err(other) => Err(LoaderError::compiler(other.to_string())),
    }
}
