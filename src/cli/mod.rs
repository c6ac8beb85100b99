//! Command-line interface module.
//!
//! The binary is a minimal host: it builds one `HostContext` per entry,
//! runs the loader, writes artifacts, and in watch mode turns registered
//! dependencies into filesystem watches.

mod args;
mod host;
mod session;
mod watch;

pub use args::{BuildArgs, Cli, Commands};
pub use host::HostContext;
pub use session::{Round, Session};
pub use watch::WatchSet;

use anyhow::{Result, bail};

use crate::compiler::ElmCompiler;
use crate::config::ProjectConfig;
use crate::loader::Loader;

/// Run the parsed command against the project configuration.
pub async fn run(cli: &Cli, project: ProjectConfig) -> Result<()> {
    let build_args = cli.command.build_args();
    let watching = cli.command.is_watching();
    let mode = build_args.mode.or(project.mode()).unwrap_or_default();

    let compiler = match &cli.elm {
        Some(program) => ElmCompiler::with_program(program),
        None => ElmCompiler::new(),
    };
    let loader = Loader::new(compiler)
        .with_global_options(project.elm)
        .with_mode(mode);

    crate::debug!("compile"; "mode: {}, watching: {}", mode, watching);
    let session = Session::new(loader, build_args, mode, watching)?;
    let round = session.build().await;

    if session.is_watching() {
        return watch::watch(&session, round).await;
    }

    for (entry, err) in &round.failures {
        crate::log!("error"; "{}: {}", entry.display(), err);
    }
    if !round.is_success() {
        bail!(
            "{} of {} entries failed to compile",
            round.failures.len(),
            round.total
        );
    }
    Ok(())
}
