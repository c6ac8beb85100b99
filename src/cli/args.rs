//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::BuildMode;

/// Dependency-aware Elm compilation orchestrator
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: elmpack.toml)
    #[arg(short = 'C', long, global = true, default_value = "elmpack.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Compiler executable (default: `elm` on PATH)
    #[arg(long, global = true, value_hint = clap::ValueHint::ExecutablePath)]
    pub elm: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile entry modules once, or keep recompiling with --watch
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Recompile when a dependency changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Compile entry modules and keep recompiling on change
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

impl Commands {
    pub fn build_args(&self) -> &BuildArgs {
        match self {
            Self::Build { build_args, .. } | Self::Serve { build_args } => build_args,
        }
    }

    /// Whether the command starts a continuous session.
    pub fn is_watching(&self) -> bool {
        match self {
            Self::Build { watch, .. } => *watch,
            Self::Serve { .. } => true,
        }
    }
}

/// Shared arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Entry modules to compile
    #[arg(required = true, value_name = "ENTRY", value_hint = clap::ValueHint::FilePath)]
    pub entries: Vec<PathBuf>,

    /// Artifact path; a directory when several entries are given (default: stdout)
    #[arg(short, long, value_hint = clap::ValueHint::AnyPath)]
    pub output: Option<PathBuf>,

    /// Build mode selecting option defaults (development, production, none)
    #[arg(short, long)]
    pub mode: Option<BuildMode>,

    /// Per-request options, e.g. `?cache&maxInstances=2` or a JSON object
    #[arg(short, long)]
    pub query: Option<String>,
}
