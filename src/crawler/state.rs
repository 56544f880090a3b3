//! Crawl states and termination reasons.

use std::fmt;

use url::Url;

/// Where the crawl loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    LoadResultsPage(u32),
    ExtractArticles(u32),
    /// Article `index` of the fresh articles on results page `page`.
    VisitArticle { page: u32, index: usize },
    PersistPageMetadata(u32),
    Advance(u32),
    Terminate(TerminationReason),
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The configured page limit was exceeded.
    PageLimitReached,
    /// The first results page listed nothing.
    NoResults,
    /// A later results page listed nothing.
    EndOfPagination,
    /// A later results page listed only articles already visited.
    NoNewArticles,
    /// A results page could not be loaded or captured.
    NavigationFailed,
}

impl TerminationReason {
    /// Whether this is a normal end of the crawl rather than a failure.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::NavigationFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageLimitReached => "page limit reached",
            Self::NoResults => "no results",
            Self::EndOfPagination => "end of pagination",
            Self::NoNewArticles => "no new articles",
            Self::NavigationFailed => "navigation failed",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `page` lies beyond `max_pages` (0 means unlimited).
pub fn past_page_limit(page: u32, max_pages: u32) -> bool {
    max_pages != 0 && page > max_pages
}

/// URL of results page `page`: the start URL with any `page` parameter
/// removed for page 1, otherwise with `page=<n>` in its query.
pub fn results_page_url(start: &Url, page: u32) -> Url {
    let kept: Vec<(String, String)> = start
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = start.clone();
    if page <= 1 && kept.is_empty() {
        url.set_query(None);
        return url;
    }

    {
        let mut query = url.query_pairs_mut();
        query.clear().extend_pairs(kept);
        if page > 1 {
            query.append_pair("page", &page.to_string());
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_page_url() {
        let start = Url::parse("https://example.dk/da/soeg").unwrap();
        assert_eq!(results_page_url(&start, 1), start);
        assert_eq!(
            results_page_url(&start, 3).as_str(),
            "https://example.dk/da/soeg?page=3"
        );
    }

    #[test]
    fn test_results_page_url_replaces_existing_page() {
        let start = Url::parse("https://example.dk/soeg?q=rente&page=9").unwrap();
        assert_eq!(
            results_page_url(&start, 2).as_str(),
            "https://example.dk/soeg?q=rente&page=2"
        );
    }

    #[test]
    fn test_first_page_drops_existing_page() {
        let start = Url::parse("https://example.dk/soeg?q=rente&page=9").unwrap();
        assert_eq!(
            results_page_url(&start, 1).as_str(),
            "https://example.dk/soeg?q=rente"
        );

        let start = Url::parse("https://example.dk/soeg?page=9").unwrap();
        assert_eq!(results_page_url(&start, 1).as_str(), "https://example.dk/soeg");
    }

    #[test]
    fn test_page_limit() {
        assert!(!past_page_limit(1000, 0));
        assert!(!past_page_limit(2, 2));
        assert!(past_page_limit(3, 2));
    }

    #[test]
    fn test_expected_terminations() {
        assert!(TerminationReason::EndOfPagination.is_expected());
        assert!(TerminationReason::NoNewArticles.is_expected());
        assert!(!TerminationReason::NavigationFailed.is_expected());
    }
}
