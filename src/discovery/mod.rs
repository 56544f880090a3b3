//! Document link discovery on article pages.
//!
//! Two strategies run over the same snapshot and their candidates are
//! merged: CSS patterns (see [`pattern`]) and JSON link attributes (see
//! [`structured`]). Neither short-circuits the other.

mod pattern;
mod structured;

use std::collections::HashSet;

use tracing::{debug, warn};
use url::Url;

use crate::dom::{PageSnapshot, SnapshotError};
use crate::models::{path_basename, path_has_extension, LinkCandidate, ResolvedLink};

pub use pattern::{default_patterns, pattern_candidates};
pub use structured::{decode_link_url, structured_candidates, LinkAttributeError};

/// Inputs for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Document extension without the dot.
    pub extension: String,
    /// Ordered selector list for the pattern strategy.
    pub patterns: Vec<String>,
    /// Attribute holding JSON link descriptors.
    pub structured_attribute: String,
}

impl DiscoverySettings {
    /// Settings using the generated selector list for `extension`.
    pub fn for_extension(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            patterns: default_patterns(extension),
            structured_attribute: "link".to_string(),
        }
    }
}

/// Parse the snapshot, run both strategies, and merge their output.
pub fn discover(
    snapshot: &PageSnapshot,
    settings: &DiscoverySettings,
) -> Result<Vec<ResolvedLink>, SnapshotError> {
    let dom = snapshot.parse()?;

    let by_pattern = pattern_candidates(&dom, &settings.patterns);
    let by_attribute = structured_candidates(&dom, &settings.structured_attribute, &settings.extension);
    debug!(
        "{}: {} pattern candidate(s), {} structured candidate(s)",
        snapshot.url,
        by_pattern.len(),
        by_attribute.len()
    );

    Ok(merge_candidates(
        dom.base_url(),
        &settings.extension,
        [by_pattern, by_attribute],
    ))
}

/// Merge candidate batches into one list keyed by resolved URL.
///
/// Batches are consumed in order and the first candidate seen for a URL
/// wins. A candidate is kept when its resolved path ends in the extension or
/// when it carries a download marker.
pub fn merge_candidates<I>(base: &Url, extension: &str, batches: I) -> Vec<ResolvedLink>
where
    I: IntoIterator<Item = Vec<LinkCandidate>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for candidate in batches.into_iter().flatten() {
        let Some(url) = candidate.resolve(base) else {
            debug!("Dropping unresolvable {} link {:?}", candidate.origin, candidate.href);
            continue;
        };

        if !path_has_extension(&url, extension) && !candidate.has_explicit_download_marker {
            continue;
        }

        if !seen.insert(url.as_str().to_string()) {
            continue;
        }

        let Some(filename) = path_basename(&url) else {
            warn!("No filename can be derived from {}, skipping", url);
            continue;
        };

        merged.push(ResolvedLink {
            url,
            filename,
            candidate,
        });
    }

    merged
}
