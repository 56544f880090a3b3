//! Organize downloaded documents by publication year.

use std::path::Path;

use console::style;

use crate::config::ArchiveConfig;
use crate::organize::{load_records, organize_by_year};

pub fn cmd_organize(config: &ArchiveConfig, metadata: Option<&Path>) -> anyhow::Result<()> {
    let store_dir = config.store_path();
    if !store_dir.is_dir() {
        println!(
            "{} Store directory {} not found",
            style("!").yellow(),
            store_dir.display()
        );
        return Ok(());
    }

    let combined = metadata
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.combined_metadata_path());
    let records = load_records(&store_dir, &combined)?;
    if records.is_empty() {
        println!("{} No metadata records found", style("!").yellow());
        return Ok(());
    }

    let report = organize_by_year(&store_dir, &records);
    println!(
        "{} Moved {} file(s), skipped {}",
        style("✓").green(),
        report.moved,
        report.skipped
    );
    Ok(())
}
