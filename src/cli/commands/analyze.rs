//! Debugging aid: show how a page is split across shadow roots.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use console::style;

use crate::config::ArchiveConfig;
use crate::discovery::discover;
use crate::dom::{Locator, PageSnapshot, BOUNDARY_ATTRIBUTE};
use crate::models::ResolvedLink;
use crate::scrapers::{BrowserSession, HttpClient, PageSurface};

/// What a single capture contains.
#[derive(Debug)]
struct BoundaryReport {
    boundaries: usize,
    /// Shadow host tag name → number of hosts.
    host_tags: BTreeMap<String, usize>,
    selector_matches: Option<usize>,
    links: Vec<ResolvedLink>,
}

fn describe(
    snapshot: &PageSnapshot,
    config: &ArchiveConfig,
    selector: Option<&str>,
) -> anyhow::Result<BoundaryReport> {
    let dom = snapshot.parse()?;

    let mut host_tags = BTreeMap::new();
    let hosts = Locator::new(&dom).find_all(&format!("[{}]", BOUNDARY_ATTRIBUTE));
    for host in hosts {
        *host_tags.entry(host.tag).or_insert(0) += 1;
    }

    let selector_matches = selector.map(|s| Locator::new(&dom).find_all(s).len());
    let boundaries = dom.boundary_count();

    let links = discover(snapshot, &config.discovery_settings())?;

    Ok(BoundaryReport {
        boundaries,
        host_tags,
        selector_matches,
        links,
    })
}

pub async fn cmd_analyze(
    config: &ArchiveConfig,
    url: &str,
    selector: Option<&str>,
    save: Option<&Path>,
) -> anyhow::Result<()> {
    let client = HttpClient::new(config.request_timeout(), config.user_agent.as_deref())
        .context("Failed to create HTTP client")?;
    let mut session = BrowserSession::launch(config.browser.clone(), client.user_agent()).await?;

    let captured = capture(&mut session, config, url).await;
    session.close().await;
    let snapshot = captured?;

    if let Some(path) = save {
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} Snapshot saved to {}", style("✓").green(), path.display());
    }

    let report = describe(&snapshot, config, selector)?;

    println!("\n{}", style(&snapshot.url).bold());
    println!("  Boundaries: {}", report.boundaries);

    println!("\n{}", style("Shadow hosts:").cyan());
    if report.host_tags.is_empty() {
        println!("  {}", style("none").dim());
    }
    for (tag, count) in &report.host_tags {
        println!("  {:<40} {}", tag, count);
    }

    if let (Some(selector), Some(count)) = (selector, report.selector_matches) {
        println!("\n{} {} match(es) for {}", style("→").cyan(), count, selector);
    }

    println!("\n{}", style("Document links:").cyan());
    if report.links.is_empty() {
        println!("  {}", style("none found").yellow());
    }
    for link in &report.links {
        println!(
            "  {} {} {}",
            style(link.candidate.origin.as_str()).dim(),
            link.url,
            style(&link.filename).dim()
        );
    }
    Ok(())
}

async fn capture(
    session: &mut BrowserSession,
    config: &ArchiveConfig,
    url: &str,
) -> anyhow::Result<PageSnapshot> {
    session.navigate(url).await?;
    session.dismiss_consent().await;
    if !session
        .wait_until_ready(&config.readiness_selector, config.readiness_timeout())
        .await
    {
        println!(
            "{} {:?} did not appear, capturing anyway",
            style("!").yellow(),
            config.readiness_selector
        );
    }
    tokio::time::sleep(config.settle_delay()).await;
    Ok(session.snapshot().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_counts_hosts_and_links() {
        let snapshot = PageSnapshot::new(
            "https://www.example.dk/da/artikel",
            vec![
                r#"<html><body>
                    <dnb-card data-boundary-root="1"></dnb-card>
                    <dnb-card data-boundary-root="2"></dnb-card>
                </body></html>"#
                    .to_string(),
                r#"<a href="/a.pdf">A</a>"#.to_string(),
                r#"<dnb-link data-boundary-root="1"></dnb-link>"#.to_string(),
            ],
        );

        let report = describe(&snapshot, &ArchiveConfig::default(), Some("a")).unwrap();
        assert_eq!(report.boundaries, 3);
        assert_eq!(report.host_tags.get("dnb-card"), Some(&2));
        assert_eq!(report.host_tags.get("dnb-link"), Some(&1));
        assert_eq!(report.selector_matches, Some(1));
        assert_eq!(report.links.len(), 1);
    }
}
