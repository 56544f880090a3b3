//! Search result items to article descriptors.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::discovery::{decode_link_url, LinkAttributeError};
use crate::dom::FoundElement;
use crate::models::ArticleDescriptor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("result item has no link url")]
    MissingUrl,
    #[error("result item link is malformed: {0}")]
    MalformedLink(String),
}

/// Result of resolving one results page.
#[derive(Debug, Default)]
pub struct PageArticles {
    /// Result items found on the page, resolvable or not.
    pub items_found: usize,
    /// Articles not seen before, in page order.
    pub fresh: Vec<ArticleDescriptor>,
    /// Resolvable items skipped because their article was already visited
    /// or listed earlier on the page.
    pub already_seen: usize,
}

/// Turns result items into descriptors and remembers which articles this
/// run has already visited.
pub struct ArticleResolver {
    base_url: Url,
    link_attribute: String,
    visited: HashSet<String>,
}

impl ArticleResolver {
    pub fn new(base_url: Url, link_attribute: impl Into<String>) -> Self {
        Self {
            base_url,
            link_attribute: link_attribute.into(),
            visited: HashSet::new(),
        }
    }

    /// Build a descriptor from one result element.
    pub fn resolve(&self, item: &FoundElement) -> Result<ArticleDescriptor, ResolveError> {
        let raw = item
            .attr(&self.link_attribute)
            .ok_or(ResolveError::MissingUrl)?;

        let href = decode_link_url(raw).map_err(|e| match e {
            LinkAttributeError::MissingUrl => ResolveError::MissingUrl,
            other => ResolveError::MalformedLink(other.to_string()),
        })?;

        let url = self
            .base_url
            .join(&href)
            .map_err(|e| ResolveError::MalformedLink(format!("{}: {}", href, e)))?;

        let field = |name: &str| item.attr(name).unwrap_or_default().to_string();
        let title = item
            .attr("header")
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or("N/A")
            .to_string();

        Ok(ArticleDescriptor {
            url: url.to_string(),
            title,
            content_type: field("content-type"),
            topic: field("topic"),
            publication_date_raw: field("date"),
            description: field("description"),
        })
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Record an article as visited. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Resolve every item on a page, dropping failures, visited articles and
    /// repeats within the page. Nothing is marked visited here.
    pub fn fresh_articles(&self, items: &[FoundElement]) -> PageArticles {
        let mut on_page = HashSet::new();
        let mut fresh = Vec::new();
        let mut already_seen = 0;

        for (index, item) in items.iter().enumerate() {
            let article = match self.resolve(item) {
                Ok(article) => article,
                Err(e) => {
                    warn!("Skipping result item {}: {}", index + 1, e);
                    continue;
                }
            };

            if self.is_visited(&article.url) || !on_page.insert(article.url.clone()) {
                debug!("Already seen {}", article.url);
                already_seen += 1;
                continue;
            }

            fresh.push(article);
        }

        PageArticles {
            items_found: items.len(),
            fresh,
            already_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn item(attrs: &[(&str, &str)]) -> FoundElement {
        FoundElement {
            tag: "dnb-search-result-item".to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            text: String::new(),
            boundary: 0,
        }
    }

    fn resolver() -> ArticleResolver {
        ArticleResolver::new(Url::parse("https://www.example.dk").unwrap(), "link")
    }

    #[test]
    fn test_resolve_full_item() {
        let article = resolver()
            .resolve(&item(&[
                ("link", r#"{"url":"/da/publikationer/rapport-1"}"#),
                ("header", "  Rapport 1 "),
                ("content-type", "Publikation"),
                ("topic", "Pengepolitik"),
                ("date", "2021-02-12T00:00:00.000Z"),
                ("description", "Kort"),
            ]))
            .unwrap();

        assert_eq!(article.url, "https://www.example.dk/da/publikationer/rapport-1");
        assert_eq!(article.title, "Rapport 1");
        assert_eq!(article.content_type, "Publikation");
        assert_eq!(article.topic, "Pengepolitik");
        assert_eq!(article.publication_date_raw, "2021-02-12T00:00:00.000Z");
        assert_eq!(article.description, "Kort");
    }

    #[test]
    fn test_resolve_defaults() {
        let article = resolver()
            .resolve(&item(&[("link", r#"{"url":"https://other.dk/x"}"#)]))
            .unwrap();
        assert_eq!(article.url, "https://other.dk/x");
        assert_eq!(article.title, "N/A");
        assert_eq!(article.topic, "");
    }

    #[test]
    fn test_resolve_errors() {
        let r = resolver();
        assert_eq!(r.resolve(&item(&[])), Err(ResolveError::MissingUrl));
        assert_eq!(
            r.resolve(&item(&[("link", r#"{"target":"_self"}"#)])),
            Err(ResolveError::MissingUrl)
        );
        assert!(matches!(
            r.resolve(&item(&[("link", "{oops")])),
            Err(ResolveError::MalformedLink(_))
        ));
        assert!(matches!(
            r.resolve(&item(&[("link", r#"{"url":"http://[::1"}"#)])),
            Err(ResolveError::MalformedLink(_))
        ));
    }

    #[test]
    fn test_fresh_articles_skips_visited_and_repeats() {
        let mut r = resolver();
        r.mark_visited("https://www.example.dk/a");

        let items = vec![
            item(&[("link", r#"{"url":"/a"}"#)]),
            item(&[("link", r#"{"url":"/b"}"#)]),
            item(&[("link", r#"{"url":"/b"}"#)]),
            item(&[]),
        ];
        let page = r.fresh_articles(&items);

        assert_eq!(page.items_found, 4);
        assert_eq!(page.fresh.len(), 1);
        assert_eq!(page.fresh[0].url, "https://www.example.dk/b");
        assert_eq!(page.already_seen, 2);
        assert!(!r.is_visited("https://www.example.dk/b"));
    }

    #[test]
    fn test_unresolvable_items_are_not_counted_as_seen() {
        let r = resolver();
        let items = vec![item(&[]), item(&[("link", "{oops")])];
        let page = r.fresh_articles(&items);

        assert_eq!(page.items_found, 2);
        assert!(page.fresh.is_empty());
        assert_eq!(page.already_seen, 0);
    }

    #[test]
    fn test_mark_visited_reports_first_time() {
        let mut r = resolver();
        assert!(r.mark_visited("https://www.example.dk/a"));
        assert!(!r.mark_visited("https://www.example.dk/a"));
        assert!(r.is_visited("https://www.example.dk/a"));
        assert!(!r.is_visited("https://www.example.dk/b"));
    }
}
