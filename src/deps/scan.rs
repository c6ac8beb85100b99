//! Deep scan of source directories.

use jwalk::WalkDir;
use std::path::{Path, PathBuf};

/// Directories never descended into.
const IGNORED_DIRS: &[&str] = &["elm-stuff", "node_modules"];

/// Collect every file under `dir` whose extension is in `extensions`.
///
/// A missing directory yields an I/O error rather than an empty list.
pub fn collect_sources(dir: &Path, extensions: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source directory `{}` does not exist", dir.display()),
        ));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir).process_read_dir(|_, _, _, children| {
        children.retain(|entry| {
            entry.as_ref().map_or(true, |e| {
                let name = e.file_name().to_str().unwrap_or_default();
                !(e.file_type().is_dir() && (name.starts_with('.') || IGNORED_DIRS.contains(&name)))
            })
        });
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
