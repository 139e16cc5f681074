use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use osvector::cli::commands::{
    handle_config, handle_execute, handle_indices, handle_search, handle_status,
};
use osvector::cli::{Cli, Commands};
use osvector::models::OutputFormat;

/// Log to stderr so stdout carries only command output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "osvector=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.format.unwrap_or(OutputFormat::Text);
    let verbose = cli.verbose;

    run_command(cli.command, cli.config.as_deref(), format, verbose).await
}

async fn run_command(
    command: Commands,
    config_path: Option<&std::path::Path>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Execute(args) => {
            handle_execute(args, config_path, format, verbose).await?;
        }
        Commands::Search(args) => {
            handle_search(args, config_path, format, verbose).await?;
        }
        Commands::Indices => {
            handle_indices(config_path, format).await?;
        }
        Commands::Status => {
            handle_status(config_path, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, config_path, format).await?;
        }
    }

    Ok(())
}
