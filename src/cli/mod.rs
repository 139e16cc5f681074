//! CLI module for the OpenSearch vector store node.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Load, insert, update and search documents in an OpenSearch k-NN index.
#[derive(Debug, Parser)]
#[command(name = "osvector")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'c', global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the node over JSON or JSONL items (load, insert, update)
    Execute(commands::ExecuteArgs),

    /// Search an index the way an agent tool would
    Search(commands::SearchArgs),

    /// List indices on the cluster
    Indices,

    /// Check the OpenSearch credentials and the embedding server
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute() {
        let cli = Cli::try_parse_from([
            "osvector",
            "--format",
            "json",
            "execute",
            "--mode",
            "load",
            "--index",
            "docs",
            "--prompt",
            "$json.q",
            "items.jsonl",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        let Commands::Execute(args) = cli.command else {
            panic!("expected execute");
        };
        assert_eq!(args.mode, "load");
        assert_eq!(args.index.as_deref(), Some("docs"));
        assert_eq!(args.prompt.as_deref(), Some("$json.q"));
        assert_eq!(args.file, Some(PathBuf::from("items.jsonl")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["osvector", "indices", "-v", "--config", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Indices));
    }

    #[test]
    fn test_mode_is_required() {
        assert!(Cli::try_parse_from(["osvector", "execute"]).is_err());
    }
}
