//! One build round over every entry module.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use rustc_hash::FxHashMap;
use tokio::task::{Id, JoinError, JoinSet};

use super::args::BuildArgs;
use super::host::HostContext;
use super::watch::WatchSet;
use crate::core::BuildMode;
use crate::error::LoaderError;
use crate::loader::Loader;

/// Extension of artifacts written into an output directory.
const ARTIFACT_EXTENSION: &str = "js";

/// Everything a build round needs, fixed for the whole session.
pub struct Session {
    loader: Loader,
    entries: Vec<PathBuf>,
    mode: BuildMode,
    watching: bool,
    query: Option<String>,
    output: Option<PathBuf>,
}

/// Result of one round.
pub struct Round {
    pub contexts: Vec<HostContext>,
    pub failures: Vec<(PathBuf, LoaderError)>,
    /// Entries attempted, including any whose task was lost.
    pub total: usize,
}

impl Round {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Entries plus everything their contexts registered.
    pub fn watch_set(&self) -> WatchSet {
        let mut set = WatchSet::default();
        for ctx in &self.contexts {
            set.add_file(ctx.entry());
            for file in &ctx.files {
                set.add_file(file);
            }
            for dir in &ctx.dirs {
                set.add_dir(dir);
            }
        }
        set
    }
}

impl Session {
    pub fn new(loader: Loader, args: &BuildArgs, mode: BuildMode, watching: bool) -> Result<Self> {
        let entries = args
            .entries
            .iter()
            .map(|entry| {
                std::path::absolute(entry)
                    .with_context(|| format!("invalid entry path `{}`", entry.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            loader,
            entries,
            mode,
            watching,
            query: args.query.clone(),
            output: args.output.clone(),
        })
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Compile every entry concurrently and write the artifacts.
    pub async fn build(&self) -> Round {
        let mut tasks = JoinSet::new();
        let mut spawned = FxHashMap::default();
        for (index, entry) in self.entries.iter().enumerate() {
            let loader = self.loader.clone();
            let mut ctx =
                HostContext::new(entry.clone(), self.mode, self.watching, self.query.clone());
            let handle = tasks.spawn(async move {
                let outcome = loader.run(&mut ctx).await;
                (index, ctx, outcome)
            });
            spawned.insert(handle.id(), index);
        }

        let mut settled = Vec::with_capacity(self.entries.len());
        let mut lost = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => settled.push(done),
                Err(e) => lost.push(self.lost_entry(&spawned, e)),
            }
        }
        settled.sort_by_key(|(index, _, _)| *index);

        let mut round = Round {
            contexts: Vec::with_capacity(settled.len()),
            failures: lost,
            total: self.entries.len(),
        };
        for (_, ctx, outcome) in settled {
            match outcome {
                Ok(artifact) => {
                    if let Err(e) = self.write_artifact(ctx.entry(), &artifact).await {
                        crate::log!("error"; "{:#}", e);
                        round
                            .failures
                            .push((ctx.entry().to_path_buf(), LoaderError::Internal(e.to_string())));
                    } else {
                        crate::debug!("compile"; "compiled `{}`", ctx.entry().display());
                    }
                }
                Err(e) => round.failures.push((ctx.entry().to_path_buf(), e)),
            }
            round.contexts.push(ctx);
        }
        round
    }

    /// Failure for an entry whose build task never settled.
    fn lost_entry(&self, spawned: &FxHashMap<Id, usize>, err: JoinError) -> (PathBuf, LoaderError) {
        let entry = spawned
            .get(&err.id())
            .and_then(|&index| self.entries.get(index))
            .cloned()
            .unwrap_or_default();
        crate::log!("error"; "build task for `{}` failed: {}", entry.display(), err);
        (entry, LoaderError::from(err))
    }

    /// Where an entry's artifact goes; `None` means stdout.
    fn artifact_path(&self, entry: &Path) -> Option<PathBuf> {
        let output = self.output.as_ref()?;
        if self.entries.len() == 1 {
            return Some(output.clone());
        }
        let stem = entry.file_stem().unwrap_or(entry.as_os_str());
        Some(output.join(stem).with_extension(ARTIFACT_EXTENSION))
    }

    async fn write_artifact(&self, entry: &Path, artifact: &str) -> Result<()> {
        let Some(path) = self.artifact_path(entry) else {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{artifact}")?;
            out.flush()?;
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        tokio::fs::write(&path, artifact)
            .await
            .with_context(|| format!("failed to write `{}`", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ElmCompiler;

    fn session(entries: &[&str], output: Option<&str>) -> Session {
        let args = BuildArgs {
            entries: entries.iter().map(PathBuf::from).collect(),
            output: output.map(PathBuf::from),
            mode: None,
            query: None,
        };
        let loader = Loader::new(ElmCompiler::new()).with_args(["elmpack"]);
        Session::new(loader, &args, BuildMode::None, false).unwrap()
    }

    #[test]
    fn test_entries_are_absolute() {
        let session = session(&["src/Main.elm"], None);
        assert!(session.entries[0].is_absolute());
        assert!(session.entries[0].ends_with("src/Main.elm"));
    }

    #[test]
    fn test_single_entry_output_is_a_file() {
        let session = session(&["src/Main.elm"], Some("dist/main.js"));
        let entry = session.entries[0].clone();
        assert_eq!(session.artifact_path(&entry), Some(PathBuf::from("dist/main.js")));
    }

    #[test]
    fn test_many_entries_output_is_a_directory() {
        let session = session(&["src/Main.elm", "src/Admin.elm"], Some("dist"));
        let entry = session.entries[1].clone();
        assert_eq!(session.artifact_path(&entry), Some(PathBuf::from("dist/Admin.js")));
    }

    #[test]
    fn test_no_output_means_stdout() {
        let session = session(&["src/Main.elm"], None);
        let entry = session.entries[0].clone();
        assert_eq!(session.artifact_path(&entry), None);
    }

    #[tokio::test]
    async fn test_write_artifact_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested/out/main.js");
        let session = session(&["src/Main.elm"], Some(target.to_str().unwrap()));

        let entry = session.entries[0].clone();
        session.write_artifact(&entry, "var Elm = {};").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "var Elm = {};");
    }

    #[tokio::test]
    async fn test_lost_task_counts_as_failure() {
        let session = session(&["src/Main.elm", "src/Admin.elm"], None);

        let mut tasks = JoinSet::<()>::new();
        let handle = tasks.spawn(async { panic!("host context crashed") });
        let spawned = FxHashMap::from_iter([(handle.id(), 1)]);
        let err = tasks.join_next().await.unwrap().unwrap_err();

        let (entry, error) = session.lost_entry(&spawned, err);
        assert_eq!(entry, session.entries[1]);
        assert!(matches!(error, LoaderError::Internal(_)));

        let round = Round {
            contexts: Vec::new(),
            failures: vec![(entry, error)],
            total: 2,
        };
        assert!(!round.is_success());
    }
}
