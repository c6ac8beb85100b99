//! Host build-tool contract.

use std::path::Path;

use crate::config::OptionMap;
use crate::core::BuildMode;

/// Per-call view of the host build tool.
///
/// The completion callback is not part of the trait: `Loader::run` returns
/// the outcome and `Loader::run_with_callback` takes an `FnOnce`, so exactly
/// one outcome is delivered per call.
pub trait LoaderContext {
    /// Entry module the host wants compiled.
    fn resource_path(&self) -> &Path;

    /// Whether the host can wait for an asynchronous completion.
    fn supports_async(&self) -> bool {
        true
    }

    /// Whether the host itself is in a watching or serving session.
    fn host_watching(&self) -> bool {
        false
    }

    /// Build mode the host runs in, if it reports one.
    fn mode(&self) -> Option<BuildMode> {
        None
    }

    /// Global option slot; falls back to the loader's project options.
    fn global_options(&self) -> Option<&OptionMap> {
        None
    }

    /// Per-call query string such as `?cache&maxInstances=2`.
    fn query(&self) -> Option<&str> {
        None
    }

    /// Per-call options object, used when no query string is given.
    fn options(&self) -> Option<&OptionMap> {
        None
    }

    /// Register a file whose change should re-run this call.
    fn add_dependency(&mut self, path: &Path);

    /// Register a directory; any change below it should re-run this call.
    fn add_context_dependency(&mut self, path: &Path);

    fn emit_warning(&mut self, message: String);

    fn emit_error(&mut self, message: String);
}
