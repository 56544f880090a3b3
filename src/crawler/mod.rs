//! Pagination-driven crawl over a results index.
//!
//! The crawler walks results pages in order, visits each article it has
//! not seen before, downloads the documents linked from it and writes
//! metadata per page. See [`CrawlState`] for the loop's states.

mod state;

pub use state::{past_page_limit, results_page_url, CrawlState, TerminationReason};

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ArchiveConfig, ConfigError};
use crate::discovery::{discover, DiscoverySettings};
use crate::dom::{FoundElement, Locator, PageSnapshot};
use crate::metadata::{write_page_batch, write_records, MetadataError};
use crate::models::{ArticleDescriptor, DownloadRecord};
use crate::resolver::ArticleResolver;
use crate::scrapers::{PageSurface, SurfaceError};
use crate::storage::ContentStore;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The navigation surface is unavailable; nothing was crawled.
    #[error("setup failed: {0}")]
    Setup(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<SurfaceError> for CrawlError {
    fn from(e: SurfaceError) -> Self {
        CrawlError::Setup(e.to_string())
    }
}

/// Crawl parameters, resolved from [`ArchiveConfig`].
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: Url,
    pub start_url: Url,
    pub max_pages: u32,
    pub result_item_selector: String,
    pub readiness_selector: String,
    pub readiness_timeout: Duration,
    pub settle_delay: Duration,
    pub structured_link_attribute: String,
    pub discovery: DiscoverySettings,
    pub store_dir: PathBuf,
    pub combined_metadata_path: PathBuf,
}

impl CrawlSettings {
    pub fn from_config(config: &ArchiveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            base_url: config.base()?,
            start_url: config.start()?,
            max_pages: config.max_pages,
            result_item_selector: config.result_item_selector.clone(),
            readiness_selector: config.readiness_selector.clone(),
            readiness_timeout: config.readiness_timeout(),
            settle_delay: config.settle_delay(),
            structured_link_attribute: config.structured_link_attribute.clone(),
            discovery: config.discovery_settings(),
            store_dir: config.store_path(),
            combined_metadata_path: config.combined_metadata_path(),
        })
    }
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_processed: u32,
    pub articles_visited: usize,
    pub documents_downloaded: usize,
    pub documents_cached: usize,
    pub failed_fetches: usize,
}

/// Outcome of [`Crawler::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub reason: TerminationReason,
    pub stats: CrawlStats,
}

/// Drives a [`PageSurface`] through the results index.
pub struct Crawler<S: PageSurface> {
    surface: S,
    store: ContentStore,
    resolver: ArticleResolver,
    settings: CrawlSettings,
    records: Vec<DownloadRecord>,
    /// Records of the results page in progress, not yet persisted.
    page_batch: Vec<DownloadRecord>,
    current_page: Option<u32>,
    stats: CrawlStats,
}

impl<S: PageSurface> Crawler<S> {
    pub fn new(surface: S, store: ContentStore, settings: CrawlSettings) -> Self {
        let resolver = ArticleResolver::new(
            settings.base_url.clone(),
            settings.structured_link_attribute.clone(),
        );
        Self {
            surface,
            store,
            resolver,
            settings,
            records: Vec::new(),
            page_batch: Vec::new(),
            current_page: None,
            stats: CrawlStats::default(),
        }
    }

    /// Treat an article as already processed.
    pub fn mark_visited(&mut self, url: &str) {
        self.resolver.mark_visited(url);
    }

    /// Every record produced so far, in crawl order, including those of a
    /// page still in progress.
    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Run until a termination condition is reached.
    ///
    /// Per-article failures are logged and skipped; only the state machine
    /// decides when to stop.
    pub async fn run(&mut self) -> CrawlSummary {
        let mut state = CrawlState::LoadResultsPage(1);
        let mut items: Vec<FoundElement> = Vec::new();
        let mut articles: Vec<ArticleDescriptor> = Vec::new();
        let mut already_seen = 0;

        loop {
            debug!("Crawl state: {:?}", state);
            state = match state {
                CrawlState::LoadResultsPage(page) => {
                    if past_page_limit(page, self.settings.max_pages) {
                        CrawlState::Terminate(TerminationReason::PageLimitReached)
                    } else {
                        match self.load_results_page(page).await {
                            Some(found) if found.is_empty() => CrawlState::Terminate(if page == 1 {
                                TerminationReason::NoResults
                            } else {
                                TerminationReason::EndOfPagination
                            }),
                            Some(found) => {
                                items = found;
                                CrawlState::ExtractArticles(page)
                            }
                            None => CrawlState::Terminate(TerminationReason::NavigationFailed),
                        }
                    }
                }

                CrawlState::ExtractArticles(page) => {
                    let resolved = self.resolver.fresh_articles(&items);
                    info!(
                        "Page {}: {} result item(s), {} new article(s)",
                        page,
                        resolved.items_found,
                        resolved.fresh.len()
                    );
                    articles = resolved.fresh;
                    already_seen = resolved.already_seen;
                    self.page_batch.clear();
                    self.current_page = Some(page);
                    CrawlState::VisitArticle { page, index: 0 }
                }

                CrawlState::VisitArticle { page, index } => match articles.get(index) {
                    Some(article) => {
                        let article = article.clone();
                        self.visit_article(&article).await;
                        CrawlState::VisitArticle {
                            page,
                            index: index + 1,
                        }
                    }
                    None => CrawlState::PersistPageMetadata(page),
                },

                CrawlState::PersistPageMetadata(page) => {
                    self.persist_page_batch(page);
                    self.page_batch.clear();
                    self.current_page = None;
                    self.stats.pages_processed += 1;

                    if page > 1 && articles.is_empty() && already_seen > 0 {
                        CrawlState::Terminate(TerminationReason::NoNewArticles)
                    } else {
                        if articles.is_empty() && already_seen == 0 {
                            warn!("Page {}: no result item could be resolved", page);
                        }
                        CrawlState::Advance(page)
                    }
                }

                CrawlState::Advance(page) => CrawlState::LoadResultsPage(page + 1),

                CrawlState::Terminate(reason) => {
                    if reason.is_expected() {
                        info!("Crawl finished: {}", reason);
                    } else {
                        warn!("Crawl stopped: {}", reason);
                    }
                    return CrawlSummary {
                        reason,
                        stats: self.stats.clone(),
                    };
                }
            };
        }
    }

    /// Write every record gathered so far to the combined metadata file.
    ///
    /// When a results page was interrupted, its partial batch is written to
    /// the page file first.
    pub fn flush(&self) -> Result<bool, MetadataError> {
        if let Some(page) = self.current_page {
            self.persist_page_batch(page);
        }
        write_records(&self.settings.combined_metadata_path, &self.records)
    }

    fn persist_page_batch(&self, page: u32) {
        if let Err(e) = write_page_batch(&self.settings.store_dir, page, &self.page_batch) {
            warn!("Could not write metadata for page {}: {}", page, e);
        }
    }

    /// Close the surface.
    pub async fn shutdown(&mut self) {
        self.surface.close().await;
    }

    /// Navigate to a results page and return its result items, or `None`
    /// when the page could not be loaded.
    async fn load_results_page(&mut self, page: u32) -> Option<Vec<FoundElement>> {
        let url = results_page_url(&self.settings.start_url, page);
        info!("Loading results page {}: {}", page, url);

        if let Err(e) = self.surface.navigate(url.as_str()).await {
            warn!("{}", e);
            return None;
        }

        if page == 1 {
            self.surface.dismiss_consent().await;
        }

        if !self
            .surface
            .wait_until_ready(&self.settings.result_item_selector, self.settings.readiness_timeout)
            .await
        {
            debug!("No result items appeared on page {} before timeout", page);
        }
        self.settle().await;

        let snapshot = match self.surface.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not capture results page {}: {}", page, e);
                return None;
            }
        };

        match result_items(&snapshot, &self.settings.result_item_selector) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Could not parse results page {}: {}", page, e);
                None
            }
        }
    }

    /// Visit one article and store its documents. Each stored document is
    /// recorded immediately in both the page batch and the global set.
    async fn visit_article(&mut self, article: &ArticleDescriptor) {
        self.resolver.mark_visited(&article.url);
        self.stats.articles_visited += 1;
        info!("Visiting article: {} ({})", article.title, article.url);

        if let Err(e) = self.surface.navigate(&article.url).await {
            warn!("Skipping article: {}", e);
            return;
        }

        if !self
            .surface
            .wait_until_ready(&self.settings.readiness_selector, self.settings.readiness_timeout)
            .await
        {
            warn!(
                "Timed out waiting for {:?} on {}, continuing",
                self.settings.readiness_selector, article.url
            );
        }
        self.settle().await;

        let snapshot = match self.surface.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not capture {}: {}", article.url, e);
                return;
            }
        };

        let links = match discover(&snapshot, &self.settings.discovery) {
            Ok(links) => links,
            Err(e) => {
                warn!("Could not parse {}: {}", article.url, e);
                return;
            }
        };

        if links.is_empty() {
            info!("No document links found on {}", article.url);
            return;
        }
        debug!("{} document link(s) on {}", links.len(), article.url);

        for link in links {
            match self.store.fetch(&link.url, &link.filename).await {
                Ok(stored) => {
                    if stored.cached {
                        self.stats.documents_cached += 1;
                    } else {
                        self.stats.documents_downloaded += 1;
                    }
                    let record = DownloadRecord::new(
                        article,
                        link.url.as_str(),
                        &stored.local_filename,
                        &stored.content_digest,
                    );
                    self.page_batch.push(record.clone());
                    self.records.push(record);
                }
                Err(e) => {
                    self.stats.failed_fetches += 1;
                    warn!("Failed to fetch {}: {}", link.url, e);
                }
            }
        }
    }

    async fn settle(&self) {
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
    }
}

/// Result items on a captured results page, across shadow boundaries.
pub fn result_items(
    snapshot: &PageSnapshot,
    selector: &str,
) -> Result<Vec<FoundElement>, crate::dom::SnapshotError> {
    let dom = snapshot.parse()?;
    Ok(Locator::new(&dom).find_all(selector))
}
