//! Links declared as JSON inside a component attribute.
//!
//! Result items and related-content cards carry an attribute such as
//! `link='{"url": "/media/x.pdf", "target": "_self"}'`.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::dom::{BoundaryForest, FoundElement, Locator};
use crate::models::{LinkCandidate, LinkOrigin};

#[derive(Debug, Error)]
pub enum LinkAttributeError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a JSON object")]
    NotAnObject,
    #[error("no usable url field")]
    MissingUrl,
}

/// Extract the `url` field from a JSON link descriptor.
pub fn decode_link_url(raw: &str) -> Result<String, LinkAttributeError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(LinkAttributeError::NotAnObject)?;
    object
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or(LinkAttributeError::MissingUrl)
}

/// Candidates from every element carrying `attribute`, keeping only those
/// whose declared URL path ends in `.{extension}`.
pub fn structured_candidates<F>(forest: &F, attribute: &str, extension: &str) -> Vec<LinkCandidate>
where
    F: BoundaryForest<Element = FoundElement> + ?Sized,
{
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    let elements = Locator::new(forest).find_all(&format!("[{}]", attribute));

    elements
        .into_iter()
        .filter_map(|element| {
            let raw = element.attr(attribute)?;
            let url = match decode_link_url(raw) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping <{}> {} attribute: {}", element.tag, attribute, e);
                    return None;
                }
            };

            if !declared_path(&url).to_ascii_lowercase().ends_with(&suffix) {
                return None;
            }

            let display_text = element
                .attr("name")
                .or_else(|| element.attr("header"))
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string);

            Some(LinkCandidate {
                href: url,
                display_text,
                has_explicit_download_marker: element.has_attr("download"),
                origin: LinkOrigin::StructuredAttr,
            })
        })
        .collect()
}

/// The path part of a possibly relative URL.
fn declared_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
