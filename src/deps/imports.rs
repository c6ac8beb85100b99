//! Dependency discovery by following `import` statements.
//!
//! Starting from a module, every `import A.B` is mapped to `A/B.elm` under
//! each source directory of the nearest `elm.json`. Imports that do not map
//! to a file (package modules such as `Html`) are skipped.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::manifest::{Manifest, clean_join, find_manifest};
use crate::error::{LoaderError, Result};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^import\s+([A-Z][A-Za-z0-9_]*(?:\.[A-Z][A-Za-z0-9_]*)*)")
        .expect("import pattern is valid")
});

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{-.*?-\}").expect("comment pattern is valid"));

/// Module names imported by a source text.
pub fn parse_imports(source: &str) -> Vec<String> {
    let source = BLOCK_COMMENT.replace_all(source, "");
    IMPORT
        .captures_iter(&source)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// All local modules `entry` depends on, transitively, entry included.
pub fn find_all_dependencies(entry: &Path) -> Result<Vec<PathBuf>> {
    let dir = entry.parent().unwrap_or(Path::new("."));
    let manifest_path = find_manifest(dir).ok_or_else(|| {
        LoaderError::Dependency(format!(
            "could not find elm.json above `{}`",
            entry.display()
        ))
    })?;
    let root = manifest_path.parent().unwrap_or(Path::new("."));

    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        LoaderError::Dependency(format!("failed to read `{}`: {e}", manifest_path.display()))
    })?;
    let source_dirs: Vec<PathBuf> = Manifest::parse(&content)
        .and_then(|m| m.source_directories())
        .map_err(|e| LoaderError::Dependency(format!("{}: {e}", manifest_path.display())))?
        .iter()
        .map(|d| clean_join(root, Path::new(d)))
        .collect();

    let mut visited = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![entry.to_path_buf()];

    while let Some(file) = stack.pop() {
        if !visited.insert(file.clone()) {
            continue;
        }

        let source = fs::read_to_string(&file).map_err(|e| {
            LoaderError::Dependency(format!("failed to read `{}`: {e}", file.display()))
        })?;

        for module in parse_imports(&source) {
            let rel = PathBuf::from(format!("{}.elm", module.replace('.', "/")));
            if let Some(found) = source_dirs
                .iter()
                .map(|dir| dir.join(&rel))
                .find(|candidate| candidate.is_file())
                && !visited.contains(&found)
            {
                stack.push(found);
            }
        }
        order.push(file);
    }

    Ok(order)
}
