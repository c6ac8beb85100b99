//! Core types - pure abstractions shared across the codebase.

mod mode;
mod watch;

pub use mode::BuildMode;
pub use watch::{WatchSignals, is_watch_mode};
