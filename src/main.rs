//! Tilebridge - keeps a JSON document in sync with a sandboxed render surface.

#![allow(dead_code)]

mod channel;
mod cli;
mod config;
mod host;
mod logger;
mod protocol;
mod surface;
mod utils;

use std::time::Duration;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, render::RenderOptions};
use config::BridgeConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = BridgeConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { document, .. } => cli::serve::serve_document(document, &config),
        Commands::Render {
            document,
            state,
            select,
            timeout,
        } => {
            let options = RenderOptions {
                state: state.as_deref(),
                select: *select,
                timeout: Duration::from_secs(*timeout),
            };
            cli::render::render_document(document, options, &config)
        }
    }
}
