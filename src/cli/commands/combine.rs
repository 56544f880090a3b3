//! Recombine per-page metadata files.

use console::style;

use crate::config::ArchiveConfig;
use crate::metadata::combine_page_files;

pub fn cmd_combine(config: &ArchiveConfig) -> anyhow::Result<()> {
    let store_dir = config.store_path();

    let Some(report) = combine_page_files(&store_dir)? else {
        println!(
            "{} Store directory {} not found, nothing to combine",
            style("!").yellow(),
            store_dir.display()
        );
        return Ok(());
    };

    match report.output {
        Some(path) => println!(
            "{} Combined {} record(s) from {} page file(s) into {}",
            style("✓").green(),
            report.records,
            report.files_read,
            path.display()
        ),
        None => println!(
            "{} No records found in {} page file(s)",
            style("!").yellow(),
            report.files_read
        ),
    }
    Ok(())
}
