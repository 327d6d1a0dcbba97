//! Remove command - drop a catalog from the cache log

use crate::cache::{CacheLogEntry, HaloTableCache, RemoveOptions};
use crate::cli::args::RemoveArgs;
use crate::config::Config;
use crate::error::HalocatResult;
use console::style;

/// Execute the remove command
pub fn execute(args: RemoveArgs, config: &Config) -> HalocatResult<()> {
    let mut cache = HaloTableCache::open_default(config)?;

    let key = CacheLogEntry::new(
        args.simname,
        args.halo_finder,
        args.version_name,
        args.redshift,
        &args.fname,
    )?;

    let options = RemoveOptions {
        raise_if_missing: args.strict,
        update_log: true,
        delete_file: args.delete_file,
    };

    match cache.remove_entry(&key, options)? {
        Some(removed) => {
            println!("{} Removed {}", style("✓").green(), removed);
            if args.delete_file {
                println!("  Deleted {}", style(removed.fname.display()).dim());
            }
        }
        None => {
            println!("{} No matching entry for {}", style("!").yellow(), key);
        }
    }

    Ok(())
}
