//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// halocat - halo catalog cache maintenance
///
/// Inspects, audits, and prunes the cache of user-supplied halo catalogs.
#[derive(Parser, Debug)]
#[command(name = "halocat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "HALOCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides the configured one)
    #[arg(long, global = true, env = "HALOCAT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cached halo catalogs
    List(ListArgs),

    /// Remove a catalog from the cache log
    Remove(RemoveArgs),

    /// Check every cache log entry against its catalog file
    Verify,

    /// Show the attributes and columns of a catalog file
    Inspect(InspectArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Only entries for this simulation
    #[arg(long)]
    pub simname: Option<String>,

    /// Only entries from this halo finder
    #[arg(long)]
    pub halo_finder: Option<String>,

    /// Only entries with this version name
    #[arg(long)]
    pub version_name: Option<String>,

    /// Only entries near this redshift
    #[arg(long, allow_negative_numbers = true)]
    pub redshift: Option<f64>,

    /// Redshift matching tolerance
    #[arg(long, default_value_t = crate::cache::DEFAULT_DZ_TOL)]
    pub dz_tol: f64,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    pub simname: String,

    pub halo_finder: String,

    pub version_name: String,

    #[arg(allow_negative_numbers = true)]
    pub redshift: f64,

    /// Catalog file path as recorded in the log
    pub fname: PathBuf,

    /// Also delete the catalog file
    #[arg(long)]
    pub delete_file: bool,

    /// Fail when no entry matches
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Catalog file to read
    pub fname: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
