//! Watch-mode detection.
//!
//! A session is incremental when any of these holds:
//! - the request sets `forceWatch`
//! - the host reports it is itself watching or serving
//! - the launch arguments carry `-w`, `--watch`, or a dev-server token
//!
//! Only token matching is done here: unrelated arguments are never parsed.

use std::ffi::OsStr;
use std::path::Path;

/// Short watch flag.
const SHORT_FLAG: &str = "-w";
/// Long watch flag.
const LONG_FLAG: &str = "--watch";
/// Executables whose presence means the host is a continuous dev server.
const SERVE_TOKENS: &[&str] = &["webpack-dev-server", "webpack-serve"];
/// Subcommands that start a continuous host session.
const SERVE_COMMANDS: &[&str] = &["serve"];

/// Non-argument inputs to watch detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSignals {
    /// Per-request `forceWatch` option.
    pub force: bool,
    /// Host reports a watching or serving session.
    pub host_watching: bool,
}

/// Classify the current session as incremental or one-shot.
pub fn is_watch_mode<I, S>(args: I, signals: WatchSignals) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    signals.force || signals.host_watching || args.into_iter().any(|a| is_watch_token(a.as_ref()))
}

fn is_watch_token(arg: &OsStr) -> bool {
    let Some(arg) = arg.to_str() else {
        return false;
    };

    if arg == SHORT_FLAG || arg == LONG_FLAG || arg == "--watch=true" {
        return true;
    }

    if SERVE_COMMANDS.contains(&arg) {
        return true;
    }

    // `node_modules/.bin/webpack-dev-server` or `webpack-dev-server.js`
    let stem = Path::new(arg)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    SERVE_TOKENS.contains(&stem)
}
