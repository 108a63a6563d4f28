//! Artdeck CLI - build a trading-card artwork captioning dataset.
//!
//! Two batch pipelines, each resumable by simply running it again:
//!
//! ```bash
//! # Tag every card in a bulk export and download its art
//! artdeck harvest --cards unique-artwork.json --output-dir images
//!
//! # Caption every image that has a tag file next to it
//! artdeck caption --img_dir images
//!
//! # View configuration
//! artdeck config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Artdeck - harvest card art and tags, then caption it with a vision model.
#[derive(Parser, Debug)]
#[command(name = "artdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "ARTDECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag cards from a bulk export and download their art
    Harvest(cli::harvest::HarvestArgs),

    /// Caption tagged images with a vision model
    Caption(cli::caption::CaptionArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

fn load_config(path: Option<&PathBuf>) -> artdeck_core::Config {
    let loaded = match path {
        Some(path) => artdeck_core::Config::load_from(path),
        None => artdeck_core::Config::load(),
    };
    // Logging isn't initialized yet, so warnings go straight to stderr.
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `artdeck config path`."
            );
            artdeck_core::Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref());
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Artdeck v{}", artdeck_core::VERSION);

    match cli.command {
        Commands::Harvest(args) => cli::harvest::execute(args, config).await,
        Commands::Caption(args) => cli::caption::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["artdeck", "harvest", "-v", "--json-logs"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Harvest(_)));
    }

    #[test]
    fn test_missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config.caption.max_new_tokens, 24);
    }
}
