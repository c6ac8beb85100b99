//! Elmpack - dependency-aware Elm compilation for build tools.
//!
//! A host build tool hands each entry module to a [`loader::Loader`], which
//! compiles it through the external `elm` compiler and, in watch sessions,
//! reports the files and directories the entry depends on so the host can
//! re-run it when they change.
//!
//! - `config`: option layering, query strings, `elmpack.toml`
//! - `core`: build mode and watch-mode detection
//! - `deps`: dependency resolution and the process-wide cache
//! - `compiler`: admission control and the compiler process
//! - `loader`: the orchestrator and the host contract
//! - `cli`: the `elmpack` command-line host

#[macro_use]
pub mod logger;

pub mod cli;
pub mod compiler;
pub mod config;
pub mod core;
pub mod deps;
pub mod error;
pub mod loader;

pub use error::{LoaderError, Result};
pub use loader::{Loader, LoaderContext};
