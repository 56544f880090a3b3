//! Crawl command.

use anyhow::Context;
use console::style;

use crate::config::ArchiveConfig;
use crate::crawler::{CrawlError, CrawlSettings, CrawlSummary, Crawler};
use crate::scrapers::{BrowserSession, HttpClient};
use crate::storage::ContentStore;

/// Crawl the configured index until a termination condition or Ctrl-C.
pub async fn cmd_crawl(config: &ArchiveConfig) -> anyhow::Result<()> {
    let settings = CrawlSettings::from_config(config).map_err(CrawlError::from)?;
    let client = HttpClient::new(config.request_timeout(), config.user_agent.as_deref())
        .context("Failed to create HTTP client")?;

    println!(
        "{} Crawling {} into {}",
        style("→").cyan(),
        settings.start_url,
        settings.store_dir.display()
    );

    let session = BrowserSession::launch(config.browser.clone(), client.user_agent())
        .await
        .map_err(CrawlError::from)?;

    let store = ContentStore::new(settings.store_dir.clone(), client);
    let mut crawler = Crawler::new(session, store, settings);

    let outcome = tokio::select! {
        summary = crawler.run() => Some(summary),
        _ = tokio::signal::ctrl_c() => None,
    };

    if outcome.is_none() {
        println!("\n{} Interrupted, saving metadata", style("!").yellow());
    }

    match crawler.flush() {
        Ok(true) => println!(
            "{} Metadata for {} document(s) saved to {}",
            style("✓").green(),
            crawler.records().len(),
            config.combined_metadata_path().display()
        ),
        Ok(false) => println!("{} No documents recorded", style("!").yellow()),
        Err(e) => eprintln!("{} Failed to save combined metadata: {}", style("✗").red(), e),
    }

    crawler.shutdown().await;

    if let Some(summary) = outcome {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    let reason = if summary.reason.is_expected() {
        style(summary.reason.as_str()).green()
    } else {
        style(summary.reason.as_str()).red()
    };
    let stats = &summary.stats;

    println!("\n{}", style("Crawl Summary").bold());
    println!("  Stopped:     {}", reason);
    println!("  Pages:       {}", stats.pages_processed);
    println!("  Articles:    {}", stats.articles_visited);
    println!("  Downloaded:  {}", stats.documents_downloaded);
    println!("  Cached:      {}", stats.documents_cached);
    if stats.failed_fetches > 0 {
        println!("  Failed:      {}", style(stats.failed_fetches).red());
    }
}
