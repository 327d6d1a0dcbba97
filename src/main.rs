//! halocat - halo catalog cache maintenance
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use halocat::cli::{Cli, Commands};
use halocat::config::ConfigManager;
use halocat::error::HalocatResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> HalocatResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let mut config = config_manager.load()?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("halocat=warn"),
        1 => EnvFilter::new("halocat=info"),
        _ => EnvFilter::new("halocat=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }

    if let Some(dir) = cli.cache_dir {
        debug!("Cache directory overridden: {}", dir.display());
        config.cache.dir = Some(dir);
    }

    // Dispatch to command
    match cli.command {
        Commands::List(args) => halocat::cli::commands::list(args, &config),
        Commands::Remove(args) => halocat::cli::commands::remove(args, &config),
        Commands::Verify => halocat::cli::commands::verify(&config),
        Commands::Inspect(args) => halocat::cli::commands::inspect(args),
        Commands::Config(args) => halocat::cli::commands::config(args, &config_manager, &config),
    }
}
