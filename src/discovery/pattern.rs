//! Selector-based link discovery.

use crate::dom::{BoundaryForest, FoundElement, Locator};
use crate::models::{LinkCandidate, LinkOrigin};

/// Ordered selector list for documents with the given extension, most
/// specific first.
pub fn default_patterns(extension: &str) -> Vec<String> {
    let ext = extension.trim_start_matches('.');
    vec![
        "a.related-card__link[download]".to_string(),
        format!(r#"a.related-card__link[href$=".{}" i]"#, ext),
        "a[download]".to_string(),
        format!(r#"a[href$=".{}" i]"#, ext),
        format!(r#"a[href*=".{}" i]"#, ext),
        "a.download-file".to_string(),
        format!("a.{}-link", ext),
        r#"[class*="related-card"] a"#.to_string(),
    ]
}

/// Run each pattern through the locator and turn every hit that has an
/// `href` into a candidate. Duplicates are left for the merge step.
pub fn pattern_candidates<F>(forest: &F, patterns: &[String]) -> Vec<LinkCandidate>
where
    F: BoundaryForest<Element = FoundElement> + ?Sized,
{
    let locator = Locator::new(forest);

    patterns
        .iter()
        .flat_map(|pattern| locator.find_all(pattern))
        .filter_map(|element| {
            let href = element.attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(LinkCandidate {
                href: href.to_string(),
                display_text: Some(element.text.clone()).filter(|text| !text.is_empty()),
                has_explicit_download_marker: element.has_attr("download"),
                origin: LinkOrigin::Pattern,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageSnapshot;

    #[test]
    fn test_default_patterns_follow_extension() {
        let patterns = default_patterns("docx");
        assert_eq!(patterns.len(), 8);
        assert_eq!(patterns[0], "a.related-card__link[download]");
        assert!(patterns.contains(&r#"a[href$=".docx" i]"#.to_string()));
        assert!(patterns.contains(&"a.docx-link".to_string()));
    }

    #[test]
    fn test_pattern_candidates_span_boundaries() {
        let snapshot = PageSnapshot::new(
            "https://www.example.dk/da/artikel",
            vec![
                r#"<html><body>
                    <a href="/contact">Contact</a>
                    <a href="/media/Annual.PDF">Annual</a>
                    <dnb-related data-boundary-root="1"></dnb-related>
                </body></html>"#
                    .to_string(),
                r#"<div class="related-card">
                    <a class="related-card__link" href="/api/file?id=9" download>Get</a>
                </div>"#
                    .to_string(),
            ],
        );
        let dom = snapshot.parse().unwrap();

        let candidates = pattern_candidates(&dom, &default_patterns("pdf"));
        let hrefs: Vec<&str> = candidates.iter().map(|c| c.href.as_str()).collect();

        assert_eq!(hrefs[0], "/api/file?id=9");
        assert!(candidates[0].has_explicit_download_marker);
        assert!(hrefs.contains(&"/media/Annual.PDF"));
        assert!(!hrefs.contains(&"/contact"));
        assert!(candidates.iter().all(|c| c.origin == LinkOrigin::Pattern));
    }
}
