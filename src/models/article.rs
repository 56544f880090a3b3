//! Article descriptors extracted from search result items.

use serde::{Deserialize, Serialize};

/// One article listed on a results page.
///
/// Identity is the canonical absolute `url`; two descriptors with the same
/// URL describe the same article regardless of their other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDescriptor {
    /// Canonical absolute URL of the article page.
    pub url: String,
    /// Display title (`"N/A"` when the result item carried none).
    pub title: String,
    /// Classification as reported by the index (e.g. "Publikation").
    pub content_type: String,
    /// Topic classification.
    pub topic: String,
    /// Publication date exactly as the index reported it.
    pub publication_date_raw: String,
    /// Teaser text.
    pub description: String,
}

impl PartialEq for ArticleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ArticleDescriptor {}
