//! Candidate document links produced by the discovery strategies.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Which discovery technique produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkOrigin {
    /// Matched one of the ordered CSS patterns.
    Pattern,
    /// Decoded from a JSON link descriptor attribute.
    StructuredAttr,
}

impl LinkOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::StructuredAttr => "structured-attr",
        }
    }
}

impl fmt::Display for LinkOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unverified reference to a downloadable document.
///
/// Several candidates may point at the same document; they are told apart
/// only after [`LinkCandidate::resolve`] turns the href into an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Href exactly as found (absolute or relative).
    pub href: String,
    /// Link text or component label, if any.
    pub display_text: Option<String>,
    /// Whether the element carried a `download` attribute.
    pub has_explicit_download_marker: bool,
    /// Strategy that produced this candidate.
    pub origin: LinkOrigin,
}

impl LinkCandidate {
    /// Resolve the href against the page base URL.
    ///
    /// Returns `None` for hrefs that do not join cleanly or that resolve to
    /// anything other than http(s) (`javascript:`, `mailto:`, ...).
    pub fn resolve(&self, base: &Url) -> Option<Url> {
        let href = self.href.trim();
        if href.is_empty() {
            return None;
        }
        let url = base.join(href).ok()?;
        match url.scheme() {
            "http" | "https" => Some(url),
            _ => None,
        }
    }
}

/// A candidate that survived the merge, with its resolved URL and the
/// filename it will be stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: Url,
    pub filename: String,
    pub candidate: LinkCandidate,
}

/// Last path segment of a URL, or `None` when the path ends in `/`.
pub fn path_basename(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Whether the URL path (query and fragment excluded) ends in `.{extension}`,
/// compared case-insensitively.
pub fn path_has_extension(url: &Url, extension: &str) -> bool {
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    url.path().to_ascii_lowercase().ends_with(&suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(href: &str) -> LinkCandidate {
        LinkCandidate {
            href: href.to_string(),
            display_text: None,
            has_explicit_download_marker: false,
            origin: LinkOrigin::Pattern,
        }
    }

    fn base() -> Url {
        Url::parse("https://www.example.dk/da/publikationer/rapport").unwrap()
    }

    #[test]
    fn test_resolve_relative_href() {
        let url = candidate("/media/files/report.pdf").resolve(&base()).unwrap();
        assert_eq!(url.as_str(), "https://www.example.dk/media/files/report.pdf");
    }

    #[test]
    fn test_resolve_absolute_href() {
        let url = candidate("https://cdn.example.dk/x.pdf")
            .resolve(&base())
            .unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.dk/x.pdf");
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        assert!(candidate("javascript:void(0)").resolve(&base()).is_none());
        assert!(candidate("mailto:info@example.dk").resolve(&base()).is_none());
        assert!(candidate("   ").resolve(&base()).is_none());
    }

    #[test]
    fn test_path_basename() {
        let url = Url::parse("https://example.dk/media/a%20b.pdf?x=1").unwrap();
        assert_eq!(path_basename(&url).as_deref(), Some("a%20b.pdf"));

        let dir = Url::parse("https://example.dk/media/").unwrap();
        assert_eq!(path_basename(&dir), None);
    }

    #[test]
    fn test_path_has_extension_ignores_case_and_query() {
        let url = Url::parse("https://example.dk/REPORT.PDF?download=1").unwrap();
        assert!(path_has_extension(&url, "pdf"));

        let url = Url::parse("https://example.dk/report.pdf.html").unwrap();
        assert!(!path_has_extension(&url, "pdf"));
    }

    #[test]
    fn test_origin_tags() {
        assert_eq!(LinkOrigin::Pattern.to_string(), "pattern");
        assert_eq!(
            serde_json::to_string(&LinkOrigin::StructuredAttr).unwrap(),
            "\"structured-attr\""
        );
    }
}
