//! Loader error taxonomy.
//!
//! | Variant         | Fatal | Delivered through              |
//! |-----------------|-------|--------------------------------|
//! | `Configuration` | yes   | completion, before async work  |
//! | `ManifestRead`  | yes   | completion                     |
//! | `Dependency`    | no*   | warning/error side-channel     |
//! | `Compiler`      | yes   | completion                     |
//! | `Internal`      | yes   | completion                     |
//!
//! `*` fatal only when `strictDependencies` is set.

use std::path::PathBuf;
use thiserror::Error;

/// Prefix every compiler failure is rewritten to.
pub const COMPILER_ERROR_PREFIX: &str = "Compiler process exited with error";

#[derive(Debug, Error)]
pub enum LoaderError {
    /// A recognized option has the wrong shape.
    #[error("{0}")]
    Configuration(String),

    /// The manifest could not be read or parsed in manifest mode.
    #[error("failed to read manifest `{path}`: {reason}")]
    ManifestRead { path: PathBuf, reason: String },

    /// Dependency query or directory scan failed.
    #[error("failed to resolve dependencies: {0}")]
    Dependency(String),

    /// The external compiler failed. The message is already normalized.
    #[error("{0}")]
    Compiler(String),

    /// The host cannot run the loader.
    #[error("elmpack currently {0}")]
    Unsupported(&'static str),

    /// A subtask panicked or was cancelled before settling.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LoaderError {
    /// Rewrite any compiler-side failure to the uniform diagnostic shape.
    pub fn compiler(message: impl AsRef<str>) -> Self {
        let message = message.as_ref().trim();
        if message.starts_with(COMPILER_ERROR_PREFIX) {
            return Self::Compiler(message.to_string());
        }
        Self::Compiler(format!("{COMPILER_ERROR_PREFIX}: {message}"))
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error may be demoted to a side-channel emission.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Dependency(_))
    }
}

impl From<tokio::task::JoinError> for LoaderError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Internal("subtask panicked".into())
        } else {
            Self::Internal("subtask was cancelled".into())
        }
    }
}

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_error_is_normalized() {
        let err = LoaderError::compiler("Compilation failed");
        assert_eq!(
            err.to_string(),
            "Compiler process exited with error: Compilation failed"
        );
    }

    #[test]
    fn test_compiler_error_not_double_prefixed() {
        let once = LoaderError::compiler("boom").to_string();
        let twice = LoaderError::compiler(&once).to_string();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_only_dependency_errors_are_recoverable() {
        assert!(LoaderError::Dependency("x".into()).is_recoverable());
        assert!(!LoaderError::compiler("x").is_recoverable());
        assert!(!LoaderError::manifest("elm.json", "missing").is_recoverable());
    }

    #[test]
    fn test_unsupported_display() {
        let err = LoaderError::Unsupported("only supports async mode");
        assert!(err.to_string().contains("currently only supports async mode"));
    }
}
