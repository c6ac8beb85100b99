//! Elmpack command-line host.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use elmpack::cli::{self, Cli};
use elmpack::config::ProjectConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    elmpack::logger::set_verbose(cli.verbose);

    let project = ProjectConfig::discover(&cli.config)?;
    if let Some(path) = &project.path {
        elmpack::debug!("config"; "loaded {}", path.display());
    }

    // Compiler processes do the heavy lifting; one thread drives them all
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::run(&cli, project))
}
