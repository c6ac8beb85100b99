//! Watch loop: rebuild when a registered dependency changes.
//!
//! ```text
//! build round ─► watch set ─► notify ─► debounce ─► build round ─► ...
//! ```
//!
//! The watch set is rebuilt after every round, so dependencies added or
//! removed by an edit are picked up by the next one.

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use super::session::{Round, Session};
use crate::logger::{status_error, status_success};

const DEBOUNCE_MS: u64 = 100;

/// Paths whose change triggers a rebuild.
#[derive(Debug, Default)]
pub struct WatchSet {
    files: FxHashSet<PathBuf>,
    dirs: FxHashSet<PathBuf>,
}

impl WatchSet {
    pub fn add_file(&mut self, path: &Path) {
        self.files.insert(path.to_path_buf());
    }

    pub fn add_dir(&mut self, path: &Path) {
        self.dirs.insert(path.to_path_buf());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path) || self.dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Directories to hand to the watcher.
    ///
    /// Files are watched through their parent so an editor replacing the
    /// file does not drop the watch.
    fn roots(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots: Vec<_> = self
            .dirs
            .iter()
            .map(|dir| (dir.clone(), RecursiveMode::Recursive))
            .collect();

        let parents: FxHashSet<&Path> = self.files.iter().filter_map(|f| f.parent()).collect();
        for parent in parents {
            if !self.dirs.iter().any(|dir| parent.starts_with(dir)) {
                roots.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
            }
        }
        roots.sort_by(|a, b| a.0.cmp(&b.0));
        roots
    }
}

/// Collects relevant paths until events stop arriving for a while.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add_event(&mut self, event: &notify::Event, set: &WatchSet) {
        use notify::EventKind;

        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            // Metadata-only changes would loop on our own reads
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => {}
            _ => return,
        }

        for path in event.paths.iter().filter(|p| set.contains(p)) {
            crate::debug!("watch"; "{:?}: {}", event.kind, path.display());
            self.pending.insert(path.clone());
            self.last_event = Some(Instant::now());
        }
    }

    fn take_if_ready(&mut self) -> Option<Vec<PathBuf>> {
        let last_event = self.last_event?;
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return None;
        }
        self.last_event = None;
        let mut changed: Vec<_> = std::mem::take(&mut self.pending).into_iter().collect();
        changed.sort();
        (!changed.is_empty()).then_some(changed)
    }

    fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(last_event) => {
                Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed())
            }
            None => Duration::from_secs(86400),
        }
    }
}

/// Start watching every root of `set`; events arrive on the returned channel.
fn start_watcher(
    set: &WatchSet,
) -> notify::Result<(RecommendedWatcher, UnboundedReceiver<notify::Event>)> {
    let (tx, rx) = unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => crate::log!("watch"; "notify error: {}", e),
        }
    })?;

    // Skip paths that vanished since the round registered them
    for (root, mode) in set.roots() {
        if root.exists() {
            watcher.watch(&root, mode)?;
        }
    }
    Ok((watcher, rx))
}

fn report(round: &Round) {
    if round.is_success() {
        let deps: usize = round
            .contexts
            .iter()
            .map(|ctx| ctx.files.len() + ctx.dirs.len())
            .sum();
        status_success(&format!(
            "compiled {} entr{} ({} dependencies)",
            round.total,
            if round.total == 1 { "y" } else { "ies" },
            deps
        ));
        return;
    }

    let detail = round
        .failures
        .iter()
        .map(|(entry, err)| format!("{}: {}", entry.display(), err))
        .collect::<Vec<_>>()
        .join("\n");
    status_error(
        &format!("{} of {} entries failed", round.failures.len(), round.total),
        &detail,
    );
}

/// Rebuild on every relevant change until Ctrl+C.
pub async fn watch(session: &Session, mut round: Round) -> Result<()> {
    report(&round);

    loop {
        let set = round.watch_set();
        let (_watcher, mut events) = start_watcher(&set)?;
        crate::debug!("watch"; "watching {} root(s)", set.roots().len());

        let mut debouncer = Debouncer::new();
        let changed = loop {
            tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    crate::log!("watch"; "stopped");
                    return Ok(());
                }
                Some(event) = events.recv() => debouncer.add_event(&event, &set),
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if let Some(changed) = debouncer.take_if_ready() {
                        break changed;
                    }
                }
            }
        };

        for path in &changed {
            crate::log!("watch"; "changed: {}", path.display());
        }
        round = session.build().await;
        report(&round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, ModifyKind};

    fn set() -> WatchSet {
        let mut set = WatchSet::default();
        set.add_file(Path::new("/app/src/Main.elm"));
        set.add_file(Path::new("/app/elm.json"));
        set.add_dir(Path::new("/app/lib"));
        set
    }

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    fn modify() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Any))
    }

    #[test]
    fn test_watch_set_membership() {
        let set = set();
        assert!(set.contains(Path::new("/app/src/Main.elm")));
        assert!(set.contains(Path::new("/app/lib/Deep/Util.elm")));
        assert!(!set.contains(Path::new("/app/src/Other.elm")));
    }

    #[test]
    fn test_roots_cover_files_and_dirs() {
        let roots = set().roots();
        let paths: Vec<_> = roots.iter().map(|(p, _)| p.as_path()).collect();
        assert_eq!(
            paths,
            vec![Path::new("/app"), Path::new("/app/lib"), Path::new("/app/src")]
        );
        assert!(matches!(roots[1].1, RecursiveMode::Recursive));
        assert!(matches!(roots[2].1, RecursiveMode::NonRecursive));
    }

    #[test]
    fn test_roots_skip_parents_inside_watched_dirs() {
        let mut set = WatchSet::default();
        set.add_dir(Path::new("/app/src"));
        set.add_file(Path::new("/app/src/Page/Home.elm"));
        assert_eq!(set.roots().len(), 1);
    }

    #[test]
    fn test_debouncer_filters_irrelevant_events() {
        let set = set();
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&event(modify(), "/app/src/Other.elm"), &set);
        debouncer.add_event(
            &event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
                "/app/src/Main.elm",
            ),
            &set,
        );
        debouncer.add_event(&event(EventKind::Access(AccessKind::Any), "/app/elm.json"), &set);
        assert!(debouncer.pending.is_empty());
        assert!(debouncer.last_event.is_none());
    }

    #[test]
    fn test_debouncer_waits_then_releases() {
        let set = set();
        let mut debouncer = Debouncer::new();

        debouncer.add_event(&event(modify(), "/app/src/Main.elm"), &set);
        debouncer.add_event(&event(EventKind::Create(CreateKind::File), "/app/lib/New.elm"), &set);
        debouncer.add_event(&event(modify(), "/app/src/Main.elm"), &set);
        assert!(debouncer.take_if_ready().is_none());
        assert!(debouncer.sleep_duration() <= Duration::from_millis(DEBOUNCE_MS));

        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        let changed = debouncer.take_if_ready().unwrap();
        assert_eq!(
            changed,
            vec![PathBuf::from("/app/lib/New.elm"), PathBuf::from("/app/src/Main.elm")]
        );
        assert!(debouncer.take_if_ready().is_none());
    }
}
