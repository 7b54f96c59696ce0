// ABOUTME: Entry point for the dockyard CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to the API server or one-shot commands.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dockyard::config::Config;
use dockyard::error::{Error, Result};
use dockyard::gateway::Gateway;
use dockyard::output::{Output, OutputMode};
use dockyard::transport;
use dockyard::types::ResourceKind;
use dockyard::validate::ListFilter;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the server logs at info and one-shot commands at warn.
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve { .. }, false) => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output);
    if let Err(e) = run(cli, &output).await {
        let kind = match &e {
            Error::Gateway(e) => Some(e.kind().as_str()),
            _ => None,
        };
        output.error(&e.to_string(), kind);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = Config::resolve(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Commands::Serve { listen } => {
            let listen = listen.unwrap_or(config.listen);
            let gateway = gateway(&config)?;
            dockyard::api::serve(listen, gateway).await?;
            Ok(())
        }
        Commands::Ls { kind, all } => {
            let gateway = gateway(&config)?;
            let filter = ListFilter {
                all,
                ..Default::default()
            };
            let rendered = match ResourceKind::from(kind) {
                ResourceKind::Container => {
                    let l = gateway.list_containers(&filter).await?;
                    output.rows(&l.records, l.skipped)
                }
                ResourceKind::Image => {
                    let l = gateway.list_images(&filter).await?;
                    output.rows(&l.records, l.skipped)
                }
                ResourceKind::Network => {
                    let l = gateway.list_networks(&filter).await?;
                    output.rows(&l.records, l.skipped)
                }
                ResourceKind::Volume => {
                    let l = gateway.list_volumes(&filter).await?;
                    output.rows(&l.records, l.skipped)
                }
            };
            print!("{rendered}");
            Ok(())
        }
        Commands::Info => {
            let gateway = gateway(&config)?;
            let summary = gateway.engine_summary().await?;
            print!("{}", output.summary(&summary));
            if output.mode() == OutputMode::Normal && summary.containers.running == 0 {
                println!("(no running containers; usage is zero)");
            }
            Ok(())
        }
    }
}

fn gateway(config: &Config) -> Result<Gateway> {
    let transport = transport::connect(&config.transport, &config.timeouts)?;
    Ok(Gateway::new(transport)
        .with_retry(config.retry)
        .with_timeouts(config.timeouts))
}
