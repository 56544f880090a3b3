//! Serialized page captures and their parsed forest.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::locator::{BoundaryForest, BoundaryId, LocateError};

/// Attribute the capture script stamps on every shadow host, holding the
/// index of the host's shadow root within [`PageSnapshot::boundaries`].
pub const BOUNDARY_ATTRIBUTE: &str = "data-boundary-root";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot has no document boundary")]
    Empty,
    #[error("invalid page URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A page captured as a list of independently serialized trees.
///
/// Index 0 is the document's outer HTML, every other index is the inner
/// HTML of one open shadow root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub boundaries: Vec<String>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, boundaries: Vec<String>) -> Self {
        Self {
            url: url.into(),
            boundaries,
        }
    }

    /// Parse every boundary into a queryable forest.
    pub fn parse(&self) -> Result<ParsedDom, SnapshotError> {
        let base_url = Url::parse(&self.url).map_err(|source| SnapshotError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;

        let mut boundaries = self.boundaries.iter();
        let document = boundaries.next().ok_or(SnapshotError::Empty)?;

        let mut trees = Vec::with_capacity(self.boundaries.len());
        trees.push(Html::parse_document(document));
        trees.extend(boundaries.map(|markup| Html::parse_fragment(markup)));

        debug!("Parsed snapshot of {} with {} boundaries", self.url, trees.len());

        Ok(ParsedDom { base_url, trees })
    }
}

/// An element matched inside one boundary, detached from the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundElement {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Descendant text with whitespace collapsed.
    pub text: String,
    pub boundary: BoundaryId,
}

impl FoundElement {
    fn from_ref(element: ElementRef<'_>, boundary: BoundaryId) -> Self {
        let value = element.value();
        let text = element.text().collect::<Vec<_>>().join(" ");
        Self {
            tag: value.name().to_string(),
            attributes: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            boundary,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Parsed form of a [`PageSnapshot`].
///
/// Holds `scraper::Html` trees, which are not `Send`; build and drop it
/// without crossing an await point.
pub struct ParsedDom {
    base_url: Url,
    trees: Vec<Html>,
}

impl ParsedDom {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn boundary_count(&self) -> usize {
        self.trees.len()
    }

    fn tree(&self, boundary: BoundaryId) -> Result<&Html, LocateError> {
        self.trees
            .get(boundary)
            .ok_or(LocateError::DetachedBoundary(boundary))
    }
}

fn compile(pattern: &str) -> Result<Selector, LocateError> {
    Selector::parse(pattern).map_err(|e| LocateError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

impl BoundaryForest for ParsedDom {
    type Element = FoundElement;

    fn root(&self) -> BoundaryId {
        0
    }

    fn query(&self, boundary: BoundaryId, pattern: &str) -> Result<Vec<FoundElement>, LocateError> {
        let selector = compile(pattern)?;
        let tree = self.tree(boundary)?;
        Ok(tree
            .select(&selector)
            .map(|element| FoundElement::from_ref(element, boundary))
            .collect())
    }

    fn hosted_boundaries(&self, boundary: BoundaryId) -> Result<Vec<BoundaryId>, LocateError> {
        let selector = compile(&format!("[{}]", BOUNDARY_ATTRIBUTE))?;
        let tree = self.tree(boundary)?;

        let mut nested = Vec::new();
        for host in tree.select(&selector) {
            let raw = host.value().attr(BOUNDARY_ATTRIBUTE).unwrap_or_default();
            match raw.trim().parse::<BoundaryId>() {
                Ok(id) => nested.push(id),
                Err(_) => debug!(
                    "Ignoring host <{}> with unparseable boundary id {:?}",
                    host.value().name(),
                    raw
                ),
            }
        }
        Ok(nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Locator;

    fn nested_snapshot() -> PageSnapshot {
        PageSnapshot::new(
            "https://www.example.dk/da/artikel",
            vec![
                r#"<html><body>
                    <a href="/top.pdf">Top</a>
                    <dnb-page data-boundary-root="1"></dnb-page>
                </body></html>"#
                    .to_string(),
                r#"<section>
                    <dnb-card data-boundary-root="2"></dnb-card>
                    <dnb-card data-boundary-root="2"></dnb-card>
                </section>"#
                    .to_string(),
                r#"<a class="related-card__link" href="/media/deep.pdf" download>
                    Deep   report
                </a>"#
                    .to_string(),
            ],
        )
    }

    #[test]
    fn test_parse_rejects_empty_and_bad_url() {
        assert!(matches!(
            PageSnapshot::new("https://example.dk", vec![]).parse(),
            Err(SnapshotError::Empty)
        ));
        assert!(matches!(
            PageSnapshot::new("not a url", vec!["<p></p>".to_string()]).parse(),
            Err(SnapshotError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_query_stays_inside_boundary() {
        let dom = nested_snapshot().parse().unwrap();
        let top = dom.query(0, "a").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].attr("href"), Some("/top.pdf"));
    }

    #[test]
    fn test_hosted_boundaries() {
        let dom = nested_snapshot().parse().unwrap();
        assert_eq!(dom.hosted_boundaries(0).unwrap(), vec![1]);
        assert_eq!(dom.hosted_boundaries(1).unwrap(), vec![2, 2]);
        assert!(dom.hosted_boundaries(2).unwrap().is_empty());
        assert_eq!(
            dom.hosted_boundaries(9),
            Err(LocateError::DetachedBoundary(9))
        );
    }

    #[test]
    fn test_locator_reaches_shared_deep_boundary_once() {
        let dom = nested_snapshot().parse().unwrap();
        let links = Locator::new(&dom).find_all("a");

        let hrefs: Vec<_> = links.iter().filter_map(|l| l.attr("href")).collect();
        assert_eq!(hrefs, vec!["/top.pdf", "/media/deep.pdf"]);

        let deep = &links[1];
        assert_eq!(deep.boundary, 2);
        assert_eq!(deep.text, "Deep report");
        assert!(deep.has_attr("download"));
    }

    #[test]
    fn test_invalid_selector_reported() {
        let dom = nested_snapshot().parse().unwrap();
        assert!(matches!(
            dom.query(0, "a[href"),
            Err(LocateError::InvalidPattern { .. })
        ));
    }
}
