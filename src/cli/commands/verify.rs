//! Verify command - audit the cache log against catalog files

use crate::cache::HaloTableCache;
use crate::config::Config;
use crate::error::{HalocatError, HalocatResult};
use console::style;

/// Execute the verify command
pub fn execute(config: &Config) -> HalocatResult<()> {
    let cache = HaloTableCache::open_default(config)?;
    let problems = cache.verify_all();

    if problems.is_empty() {
        println!(
            "{} {} cache log entries are consistent",
            style("✓").green(),
            cache.len()
        );
        return Ok(());
    }

    for (entry, issues) in &problems {
        println!("{} {}", style("✗").red(), entry);
        for issue in issues {
            println!("    {}", issue);
        }
    }

    Err(HalocatError::User(format!(
        "{} of {} cache log entries are inconsistent",
        problems.len(),
        cache.len()
    )))
}
