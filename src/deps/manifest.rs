//! Project manifest (`elm.json`) reading.

use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{LoaderError, Result};

/// Manifest file name inside the working directory.
pub const MANIFEST_NAME: &str = "elm.json";

/// The parts of `elm.json` this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Application source directories, relative to the manifest.
    #[serde(rename = "source-directories", default)]
    source_directories: Option<Vec<String>>,

    /// `application` or `package`.
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl Manifest {
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Declared source directories; packages always use `src`.
    pub fn source_directories(&self) -> std::result::Result<Vec<String>, String> {
        match (&self.source_directories, self.kind.as_deref()) {
            (Some(dirs), _) => Ok(dirs.clone()),
            (None, Some("package")) => Ok(vec!["src".into()]),
            (None, _) => Err("missing `source-directories`".into()),
        }
    }
}

/// Manifest location plus its resolved source directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSources {
    pub manifest: PathBuf,
    pub directories: Vec<PathBuf>,
}

/// Read `<cwd>/elm.json` and resolve its source directories under `cwd`.
pub fn read_manifest(cwd: &Path) -> Result<ManifestSources> {
    let path = cwd.join(MANIFEST_NAME);
    let content = fs::read_to_string(&path).map_err(|e| LoaderError::manifest(&path, e))?;
    let manifest = Manifest::parse(&content).map_err(|e| LoaderError::manifest(&path, e))?;
    let dirs = manifest
        .source_directories()
        .map_err(|e| LoaderError::manifest(&path, e))?;

    let directories = dirs.iter().map(|dir| clean_join(cwd, Path::new(dir))).collect();
    Ok(ManifestSources {
        manifest: path,
        directories,
    })
}

/// Find the nearest manifest in `start` or one of its ancestors.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}

/// Join and lexically normalize `.` and `..` without touching the disk.
pub fn clean_join(base: &Path, rel: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(rel).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
