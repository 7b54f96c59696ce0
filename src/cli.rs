// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use dockyard::output::OutputMode;
use dockyard::types::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockyard")]
#[command(about = "Resource-lifecycle gateway for Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discovered in the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Listen address (overrides the configuration file)
        #[arg(long)]
        listen: Option<std::net::SocketAddr>,
    },

    /// List resources of one kind
    Ls {
        #[arg(value_enum)]
        kind: KindArg,

        /// Include stopped containers or intermediate images
        #[arg(short, long)]
        all: bool,
    },

    /// Show the engine summary
    Info,

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    #[value(alias = "container")]
    Containers,
    #[value(alias = "image")]
    Images,
    #[value(alias = "network")]
    Networks,
    #[value(alias = "volume")]
    Volumes,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Containers => ResourceKind::Container,
            KindArg::Images => ResourceKind::Image,
            KindArg::Networks => ResourceKind::Network,
            KindArg::Volumes => ResourceKind::Volume,
        }
    }
}
