//! List command - show cached halo catalogs

use crate::cache::{CacheLogEntry, EntryFilter, HaloTableCache};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::HalocatResult;
use console::style;

/// Execute the list command
pub fn execute(args: ListArgs, config: &Config) -> HalocatResult<()> {
    let cache = HaloTableCache::open_default(config)?;
    let filter = filter_from_args(&args);
    let entries = cache.matching_entries(&filter);

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cached halo catalogs"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn filter_from_args(args: &ListArgs) -> EntryFilter {
    EntryFilter {
        simname: args.simname.clone(),
        halo_finder: args.halo_finder.clone(),
        version_name: args.version_name.clone(),
        redshift: args.redshift,
        dz_tol: args.dz_tol,
    }
}

fn print_table(entries: &[&CacheLogEntry]) {
    println!(
        "{:<20} {:<16} {:<20} {:<9} {}",
        style("SIMNAME").bold(),
        style("HALO_FINDER").bold(),
        style("VERSION").bold(),
        style("REDSHIFT").bold(),
        style("FNAME").bold()
    );
    println!("{}", "-".repeat(90));

    for entry in entries {
        let fname = if entry.fname.is_file() {
            style(entry.fname.display().to_string()).green()
        } else {
            style(entry.fname.display().to_string()).red()
        };

        println!(
            "{:<20} {:<16} {:<20} {:<9} {}",
            entry.simname,
            entry.halo_finder,
            entry.version_name,
            entry.redshift_string(),
            fname
        );
    }

    println!();
    println!("{} catalog(s)", entries.len());
}

fn print_json(entries: &[&CacheLogEntry]) -> HalocatResult<()> {
    let json = serde_json::to_string_pretty(entries)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(entries: &[&CacheLogEntry]) {
    for entry in entries {
        println!("{}", entry.fname.display());
    }
}
