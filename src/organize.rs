//! Move downloaded documents into per-year directories.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::metadata::{load_page_records, read_records, MetadataError};
use crate::storage::sidecar_path;

/// Moved and skipped counts from one organize pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeReport {
    pub moved: usize,
    pub skipped: usize,
}

/// Year of a raw publication date such as `2021-02-12T00:00:00.000Z`.
///
/// The text before the first `-` must be exactly four ASCII digits.
pub fn extract_year(date: &str) -> Option<&str> {
    let year = date.trim().split('-').next()?;
    (year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit())).then_some(year)
}

/// Records to organize by: the combined file when present, otherwise the
/// per-page files.
pub fn load_records(store_dir: &Path, combined: &Path) -> Result<Vec<Value>, MetadataError> {
    if combined.is_file() {
        info!("Organizing from {}", combined.display());
        return read_records(combined);
    }
    info!(
        "{} not found, falling back to page metadata files",
        combined.display()
    );
    load_page_records(store_dir)
}

fn string_field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Move every record's file (and sidecar) into `<store>/<year>/`.
///
/// Records without a usable date or whose file is missing are skipped, as
/// are files already present at the destination. Each filename is handled
/// at most once.
pub fn organize_by_year(store_dir: &Path, records: &[Value]) -> OrganizeReport {
    let mut report = OrganizeReport::default();
    let mut processed = HashSet::new();

    for record in records {
        let Some(filename) = string_field(record, &["local_filename", "downloaded_filename"]) else {
            warn!("Skipping record without a local filename");
            continue;
        };
        if !processed.insert(filename.to_string()) {
            continue;
        }

        let date = string_field(record, &["publication_date_raw", "date"]).unwrap_or_default();
        let Some(year) = extract_year(date) else {
            warn!("Skipping {}: no year in date {:?}", filename, date);
            report.skipped += 1;
            continue;
        };

        // Only bare names are moved.
        if Path::new(filename).file_name().and_then(|n| n.to_str()) != Some(filename) {
            warn!("Skipping {}: not a plain filename", filename);
            report.skipped += 1;
            continue;
        }

        let source = store_dir.join(filename);
        if !source.is_file() {
            debug!("Skipping {}: not present in store", filename);
            report.skipped += 1;
            continue;
        }

        let year_dir = store_dir.join(year);
        let destination = year_dir.join(filename);
        if destination.exists() {
            debug!("{} already organized under {}", filename, year);
            report.skipped += 1;
            continue;
        }

        match move_with_sidecar(&source, &year_dir, &destination) {
            Ok(()) => {
                debug!("Moved {} -> {}", filename, destination.display());
                report.moved += 1;
            }
            Err(e) => {
                warn!("Failed to move {} into {}: {}", filename, year_dir.display(), e);
                report.skipped += 1;
            }
        }
    }

    info!(
        "Organize complete: {} moved, {} skipped",
        report.moved, report.skipped
    );
    report
}

fn move_with_sidecar(source: &Path, year_dir: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(year_dir)?;
    std::fs::rename(source, destination)?;

    let sidecar = sidecar_path(source);
    if sidecar.is_file() {
        std::fs::rename(&sidecar, sidecar_path(destination))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2021-02-12T00:00:00.000Z"), Some("2021"));
        assert_eq!(extract_year("1999"), Some("1999"));
        assert_eq!(extract_year("not-a-date"), None);
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("21-02-12"), None);
        assert_eq!(extract_year("２０２１-01-01"), None);
    }

    #[test]
    fn test_organize_moves_file_and_sidecar() {
        let dir = tempdir().unwrap();
        let store = dir.path();
        std::fs::write(store.join("a.pdf"), b"a").unwrap();
        std::fs::write(store.join("a.pdf.sha256"), "digest").unwrap();

        let records = vec![json!({
            "local_filename": "a.pdf",
            "publication_date_raw": "2021-02-12T00:00:00.000Z"
        })];
        let report = organize_by_year(store, &records);

        assert_eq!(report, OrganizeReport { moved: 1, skipped: 0 });
        assert!(store.join("2021/a.pdf").is_file());
        assert!(store.join("2021/a.pdf.sha256").is_file());
        assert!(!store.join("a.pdf").exists());
    }

    #[test]
    fn test_organize_skips_bad_dates_and_missing_files() {
        let dir = tempdir().unwrap();
        let store = dir.path();
        std::fs::write(store.join("nodate.pdf"), b"x").unwrap();
        std::fs::write(store.join("empty.pdf"), b"x").unwrap();

        let records = vec![
            json!({"local_filename": "nodate.pdf", "publication_date_raw": "not-a-date"}),
            json!({"local_filename": "empty.pdf", "publication_date_raw": ""}),
            json!({"local_filename": "gone.pdf", "publication_date_raw": "2020-01-01"}),
            json!({"local_filename": "../escape.pdf", "publication_date_raw": "2020-01-01"}),
        ];
        let report = organize_by_year(store, &records);

        assert_eq!(report, OrganizeReport { moved: 0, skipped: 4 });
        assert!(store.join("nodate.pdf").is_file());
        assert!(store.join("empty.pdf").is_file());
    }

    #[test]
    fn test_organize_collision_and_duplicates() {
        let dir = tempdir().unwrap();
        let store = dir.path();
        std::fs::create_dir_all(store.join("2019")).unwrap();
        std::fs::write(store.join("2019/b.pdf"), b"old").unwrap();
        std::fs::write(store.join("b.pdf"), b"new").unwrap();

        let record = json!({"local_filename": "b.pdf", "publication_date_raw": "2019-05-01"});
        let report = organize_by_year(store, &[record.clone(), record]);

        assert_eq!(report, OrganizeReport { moved: 0, skipped: 1 });
        assert_eq!(std::fs::read(store.join("2019/b.pdf")).unwrap(), b"old");
        assert!(store.join("b.pdf").is_file());
    }

    #[test]
    fn test_load_records_falls_back_to_pages() {
        let dir = tempdir().unwrap();
        let store = dir.path();
        std::fs::write(
            store.join("metadata_page_1.json"),
            r#"[{"local_filename": "p.pdf"}]"#,
        )
        .unwrap();

        let combined = store.join("docs_metadata.json");
        assert_eq!(load_records(store, &combined).unwrap().len(), 1);

        std::fs::write(&combined, r#"[{"local_filename": "x.pdf"}, {"local_filename": "y.pdf"}]"#)
            .unwrap();
        assert_eq!(load_records(store, &combined).unwrap().len(), 2);
    }
}
