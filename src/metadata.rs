//! Metadata files written alongside the downloaded documents.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::DownloadRecord;

/// Output of the `combine` utility.
pub const RECOMBINED_FILE: &str = "all_metadata_combined.json";

const PAGE_FILE_PREFIX: &str = "metadata_page_";
const PAGE_FILE_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Path of the metadata file for results page `page`.
pub fn page_file_path(store_dir: &Path, page: u32) -> PathBuf {
    store_dir.join(format!("{}{}{}", PAGE_FILE_PREFIX, page, PAGE_FILE_SUFFIX))
}

/// Page number encoded in a page metadata filename.
pub fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PAGE_FILE_PREFIX)?
        .strip_suffix(PAGE_FILE_SUFFIX)?
        .parse()
        .ok()
}

/// Write records as a pretty-printed JSON array. Empty batches are not
/// written; returns whether a file was produced.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<bool, MetadataError> {
    if records.is_empty() {
        debug!("No records for {}, not writing", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| MetadataError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(records).map_err(|source| MetadataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(true)
}

/// Persist one page's batch to `metadata_page_<n>.json`.
pub fn write_page_batch(
    store_dir: &Path,
    page: u32,
    records: &[DownloadRecord],
) -> Result<bool, MetadataError> {
    write_records(&page_file_path(store_dir, page), records)
}

/// Read a metadata file as raw JSON objects.
///
/// An array yields its object elements; a lone object is one record.
pub fn read_records(path: &Path) -> Result<Vec<Value>, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| MetadataError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(match value {
        Value::Array(items) => items.into_iter().filter(Value::is_object).collect(),
        object @ Value::Object(_) => vec![object],
        other => {
            warn!(
                "{} holds a JSON {}, expected records",
                path.display(),
                json_kind(&other)
            );
            Vec::new()
        }
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Page metadata files in the store, ordered by page number.
pub fn page_files(store_dir: &Path) -> Result<Vec<(u32, PathBuf)>, MetadataError> {
    let entries = std::fs::read_dir(store_dir).map_err(|source| MetadataError::Io {
        path: store_dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let page = page_number(name.to_str()?)?;
            Some((page, entry.path()))
        })
        .collect();
    files.sort_by_key(|(page, _)| *page);
    Ok(files)
}

/// Concatenation of every readable page file. Unreadable or malformed
/// files are skipped with a warning.
pub fn load_page_records(store_dir: &Path) -> Result<Vec<Value>, MetadataError> {
    let mut records = Vec::new();
    for (page, path) in page_files(store_dir)? {
        match read_records(&path) {
            Ok(batch) => {
                debug!("Page {}: {} record(s)", page, batch.len());
                records.extend(batch);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

/// Summary of a recombination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineReport {
    pub files_read: usize,
    pub records: usize,
    /// None when there was nothing to write.
    pub output: Option<PathBuf>,
}

/// Recombine the per-page files into [`RECOMBINED_FILE`].
///
/// Returns `Ok(None)` when the store directory does not exist.
pub fn combine_page_files(store_dir: &Path) -> Result<Option<CombineReport>, MetadataError> {
    if !store_dir.is_dir() {
        warn!("Store directory {} does not exist", store_dir.display());
        return Ok(None);
    }

    let files_read = page_files(store_dir)?.len();
    let records = load_page_records(store_dir)?;
    let output = store_dir.join(RECOMBINED_FILE);
    let written = write_records(&output, &records)?;

    Ok(Some(CombineReport {
        files_read,
        records: records.len(),
        output: written.then_some(output),
    }))
}
