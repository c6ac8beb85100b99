//! Dependency-aware compilation orchestrator.
//!
//! One `Loader` is built per process and shared (cheaply cloned) by every
//! call. Per call:
//!
//! ```text
//! options ─► watch detection ─┬─► dependency resolution ─┐
//!                             └─► admission ─► compile ───┴─► aggregate ─► caller
//! ```
//!
//! Dependency resolution only runs in watch mode, and is skipped when the
//! `cache` option is set and the process-wide cache is non-empty. The
//! compilation never starts before its admission token is granted, and the
//! outcome is delivered only after every launched subtask has settled.

mod context;
mod emit;
mod outcome;
mod request;


pub use context::LoaderContext;
pub use emit::{Emission, EmissionQueue, Emitter};
pub use outcome::{Aggregate, aggregate};
pub use request::CompilationRequest;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::compiler::{Admission, Compiler, ElmCompiler, invoke};
use crate::config::{self, OptionMap, parse_query};
use crate::core::{BuildMode, WatchSignals, is_watch_mode};
use crate::deps::{self, DependencyCache, DependencySet, Strategy, read_manifest};
use crate::error::{LoaderError, Result};

// =============================================================================
// Shared state
// =============================================================================

/// Process-wide state shared by all calls of one loader.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Union of every successful dependency resolution.
    pub dependencies: DependencyCache,
    /// Running compiler-process counter.
    pub admission: Arc<Admission>,
    /// Entries compiled successfully at least once.
    compiled: Mutex<FxHashSet<PathBuf>>,
    /// Number of dependency resolutions launched.
    resolutions: AtomicUsize,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn was_compiled(&self, entry: &Path) -> bool {
        self.compiled.lock().contains(entry)
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    fn mark_compiled(&self, entry: &Path) {
        self.compiled.lock().insert(entry.to_path_buf());
    }
}

/// What to do about dependencies for one call.
enum Plan {
    /// One-shot build: trust the compiler.
    Skip,
    /// Cache hit: cached registrations already replayed.
    Cached,
    /// Resolve concurrently with the compilation.
    Resolve(Strategy),
}

// =============================================================================
// Loader
// =============================================================================

/// The orchestrator.
pub struct Loader<C: Compiler = ElmCompiler> {
    compiler: Arc<C>,
    state: Arc<SharedState>,
    /// Global option layer used when the context has none.
    global: Arc<OptionMap>,
    /// Build mode used when the context reports none.
    mode: BuildMode,
    /// Process launch arguments for watch detection.
    args: Arc<[OsString]>,
}

impl<C: Compiler> Clone for Loader<C> {
    fn clone(&self) -> Self {
        Self {
            compiler: Arc::clone(&self.compiler),
            state: Arc::clone(&self.state),
            global: Arc::clone(&self.global),
            mode: self.mode,
            args: Arc::clone(&self.args),
        }
    }
}

impl<C: Compiler> Loader<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler: Arc::new(compiler),
            state: SharedState::new(),
            global: Arc::new(OptionMap::new()),
            mode: BuildMode::default(),
            args: std::env::args_os().collect(),
        }
    }

    pub fn with_global_options(mut self, options: OptionMap) -> Self {
        self.global = Arc::new(options);
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the launch arguments used for watch detection.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Share process-wide state with another loader.
    pub fn with_state(mut self, state: Arc<SharedState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn compiler(&self) -> &Arc<C> {
        &self.compiler
    }

    /// Run one call and hand its single outcome to `callback`.
    pub async fn run_with_callback<X, F>(&self, ctx: &mut X, callback: F)
    where
        X: LoaderContext + ?Sized,
        F: FnOnce(Result<String>),
    {
        callback(self.run(ctx).await);
    }

    /// Run one call: resolve options, compile, and register dependencies.
    ///
    /// Configuration and manifest errors fail before any subtask starts.
    pub async fn run<X: LoaderContext + ?Sized>(&self, ctx: &mut X) -> Result<String> {
        if !ctx.supports_async() {
            return Err(LoaderError::Unsupported("only supports async mode"));
        }

        let request = self.prepare(ctx)?;
        let mut registered = Registered::default();
        let plan = self.plan(&request, ctx, &mut registered)?;

        if self.state.was_compiled(&request.entry) {
            crate::debug!("compile"; "`{}` was compiled before, this may take a while", request.entry.display());
        }

        let (emitter, mut queue) = Emitter::channel();

        let resolution = match plan {
            Plan::Resolve(strategy) => {
                self.state.resolutions.fetch_add(1, Ordering::SeqCst);
                Some(tokio::spawn(deps::resolve(Arc::clone(&self.compiler), strategy)))
            }
            Plan::Skip | Plan::Cached => None,
        };

        let compilation = {
            let compiler = Arc::clone(&self.compiler);
            let admission = Arc::clone(&self.state.admission);
            let max_instances = request.config.loader().max_instances;
            let job = request.job();
            let emitter = emitter.clone();
            tokio::spawn(async move {
                invoke(compiler.as_ref(), &admission, max_instances, &job, &emitter).await
            })
        };
        drop(emitter);

        let (dependencies, compiled) = tokio::join!(
            async {
                match resolution {
                    Some(handle) => Some(handle.await.map_err(LoaderError::from).and_then(|r| r)),
                    None => None,
                }
            },
            compilation,
        );
        let compiled = compiled.map_err(LoaderError::from).and_then(|r| r);

        for emission in queue.drain() {
            match emission {
                Emission::Warning(msg) => ctx.emit_warning(msg),
                Emission::Error(msg) => ctx.emit_error(msg),
            }
        }

        let Aggregate {
            outcome,
            resolved,
            demoted,
        } = aggregate(dependencies, compiled, request.config.loader().strict_dependencies);

        if let Some(set) = resolved {
            crate::debug!("deps"; "resolved {} dependencies for `{}`", set.len(), request.entry.display());
            self.state.dependencies.record(&set);
            registered.register(ctx, &set);
        }

        if let Some(err) = demoted {
            crate::debug!("deps"; "{}", err);
            ctx.emit_error(err.to_string());
        }

        if outcome.is_ok() {
            self.state.mark_compiled(&request.entry);
        }
        outcome
    }

    /// Merge options, pick the compile list, and detect watch mode.
    fn prepare<X: LoaderContext + ?Sized>(&self, ctx: &X) -> Result<CompilationRequest> {
        let mode = ctx.mode().unwrap_or(self.mode);
        let global = ctx.global_options().unwrap_or(self.global.as_ref());

        let per_call = match ctx.query() {
            Some(query) if !query.trim().trim_start_matches('?').is_empty() => parse_query(query)?,
            _ => ctx.options().cloned().unwrap_or_default(),
        };

        let config = config::resolve(&config::defaults(mode), global, &per_call)?;
        let entry = ctx.resource_path().to_path_buf();
        let files = config.files_for(&entry);

        let watch = is_watch_mode(
            self.args.iter(),
            WatchSignals {
                force: config.loader().force_watch,
                host_watching: ctx.host_watching(),
            },
        );

        Ok(CompilationRequest {
            entry,
            files,
            config,
            watch,
        })
    }

    /// Decide how dependencies are handled; manifest mode reads the manifest now.
    fn plan<X: LoaderContext + ?Sized>(
        &self,
        request: &CompilationRequest,
        ctx: &mut X,
        registered: &mut Registered,
    ) -> Result<Plan> {
        if !request.watch {
            return Ok(Plan::Skip);
        }

        if request.config.loader().cache
            && let Some(cached) = self.state.dependencies.hit()
        {
            crate::debug!("deps"; "cache hit, {} dependencies", cached.len());
            registered.register(ctx, &cached);
            return Ok(Plan::Cached);
        }

        match request.cwd() {
            Some(cwd) => {
                let sources = read_manifest(cwd)?;
                registered.register(ctx, &DependencySet::from(&sources));
                Ok(Plan::Resolve(Strategy::Manifest(sources)))
            }
            None => Ok(Plan::Resolve(Strategy::Query {
                entry: request.entry.clone(),
                files: request.files.clone(),
            })),
        }
    }
}

/// Registrations already made during one call.
#[derive(Default)]
struct Registered {
    files: FxHashSet<PathBuf>,
    directories: FxHashSet<PathBuf>,
}

impl Registered {
    fn register<X: LoaderContext + ?Sized>(&mut self, ctx: &mut X, set: &DependencySet) {
        for file in set.sorted_files() {
            if self.files.insert(file.to_path_buf()) {
                ctx.add_dependency(file);
            }
        }
        for dir in set.sorted_directories() {
            if self.directories.insert(dir.to_path_buf()) {
                ctx.add_context_dependency(dir);
            }
        }
    }
}
