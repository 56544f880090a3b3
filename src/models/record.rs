//! Per-file download metadata.

use serde::{Deserialize, Serialize};

use super::ArticleDescriptor;

/// Metadata for one successfully fetched document.
///
/// Field names are the on-disk JSON keys of the metadata files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub source_article_url: String,
    pub resolved_file_url: String,
    pub local_filename: String,
    pub content_digest: String,
    pub title: String,
    pub publication_date_raw: String,
    pub content_type: String,
    pub topic: String,
    pub description: String,
}

impl DownloadRecord {
    /// Build a record from the article it was found on and the stored file.
    pub fn new(
        article: &ArticleDescriptor,
        resolved_file_url: &str,
        local_filename: &str,
        content_digest: &str,
    ) -> Self {
        Self {
            source_article_url: article.url.clone(),
            resolved_file_url: resolved_file_url.to_string(),
            local_filename: local_filename.to_string(),
            content_digest: content_digest.to_string(),
            title: article.title.clone(),
            publication_date_raw: article.publication_date_raw.clone(),
            content_type: article.content_type.clone(),
            topic: article.topic.clone(),
            description: article.description.clone(),
        }
    }
}
