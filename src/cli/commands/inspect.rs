//! Inspect command - show what a catalog file holds

use crate::cache::{ColumnarFileStore, TableStore};
use crate::catalog::Table;
use crate::cli::args::InspectArgs;
use crate::error::HalocatResult;
use console::style;

/// Execute the inspect command
pub fn execute(args: InspectArgs) -> HalocatResult<()> {
    let file = ColumnarFileStore.read(&args.fname)?;

    println!("{}", style(args.fname.display()).bold());
    println!("format: {} v{}", file.format, file.version);
    println!();

    println!("{}", style("Attributes").bold());
    for (key, value) in &file.attrs {
        println!("  {:<28} {}", key, value);
    }
    println!();

    print_table_summary("Halo table", &file.halo_table);
    if let Some(ptcls) = &file.ptcl_table {
        println!();
        print_table_summary("Particle table", ptcls);
    }

    Ok(())
}

fn print_table_summary(title: &str, table: &Table) {
    println!("{} ({} rows)", style(title).bold(), table.num_rows());
    for (name, column) in table.iter() {
        println!("  {:<28} {}", name, column.dtype());
    }
}
