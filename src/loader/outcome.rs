//! Joining subtask outcomes into the single delivered outcome.

use crate::deps::DependencySet;
use crate::error::{LoaderError, Result};

/// Reduced outcome of one request.
#[derive(Debug)]
pub struct Aggregate {
    /// Delivered to the caller, exactly once.
    pub outcome: Result<String>,
    /// Successful resolution to record and register.
    pub resolved: Option<DependencySet>,
    /// Resolution failure to report through the side-channel.
    pub demoted: Option<LoaderError>,
}

/// Reduce settled subtasks.
///
/// The compilation is authoritative. A failed resolution is demoted to a
/// side-channel error unless `strict` is set (or it is not a resolution
/// error at all, e.g. a panicked subtask), in which case it fails an
/// otherwise successful request.
pub fn aggregate(
    dependencies: Option<Result<DependencySet>>,
    compilation: Result<String>,
    strict: bool,
) -> Aggregate {
    let (resolved, failed) = match dependencies {
        None => (None, None),
        Some(Ok(set)) => (Some(set), None),
        Some(Err(e)) => (None, Some(e)),
    };

    let Some(err) = failed else {
        return Aggregate {
            outcome: compilation,
            resolved,
            demoted: None,
        };
    };

    let fatal = strict || !err.is_recoverable();
    match compilation {
        Ok(_) if fatal => Aggregate {
            outcome: Err(err),
            resolved,
            demoted: None,
        },
        outcome => Aggregate {
            outcome,
            resolved,
            demoted: Some(err),
        },
    }
}
