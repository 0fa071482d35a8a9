//! Command-line interface definitions.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::{ColorChoice, Parser, Subcommand};

/// Tilebridge document sync bridge CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show protocol traffic and other debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (searched upward from the document's directory)
    #[arg(short = 'C', long, global = true, default_value = "tilebridge.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve a document to a render surface over WebSocket
    #[command(visible_alias = "s")]
    Serve {
        /// JSON document to sync
        #[arg(value_hint = clap::ValueHint::FilePath)]
        document: PathBuf,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Render a document once with an in-process surface and print the frame
    #[command(visible_alias = "r")]
    Render {
        /// JSON document to render
        #[arg(value_hint = clap::ValueHint::FilePath)]
        document: PathBuf,

        /// Persisted surface state file, read at startup and rewritten
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        state: Option<PathBuf>,

        /// Cell index to mark as selected
        #[arg(long)]
        select: Option<usize>,

        /// Seconds to wait for images before printing what has loaded
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

impl Commands {
    /// Document the command operates on.
    pub fn document(&self) -> &Path {
        match self {
            Commands::Serve { document, .. } | Commands::Render { document, .. } => document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["tilebridge", "-v", "serve", "board.json", "-p", "6000"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("tilebridge.toml"));
        match &cli.command {
            Commands::Serve {
                port, interface, ..
            } => {
                assert_eq!(*port, Some(6000));
                assert!(interface.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cli.command.document(), Path::new("board.json"));
    }

    #[test]
    fn test_parse_render_alias() {
        let cli = Cli::parse_from(["tilebridge", "r", "b.json", "--select", "2", "-C", "x.toml"]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        match cli.command {
            Commands::Render {
                select, timeout, state, ..
            } => {
                assert_eq!(select, Some(2));
                assert_eq!(timeout, 10);
                assert!(state.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
