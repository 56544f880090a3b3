//! Page access: the browser-driven navigation surface and the HTTP client
//! used for document downloads.

pub mod browser;
mod http_client;

pub use browser::{BrowserEngineConfig, BrowserSession};
pub use http_client::{resolve_user_agent, HttpClient, USER_AGENT};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::dom::PageSnapshot;

#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The browser could not be found, launched or reached.
    #[error("browser setup failed: {0}")]
    Setup(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("page script failed: {0}")]
    Script(String),
}

/// A rendered page the crawler can drive.
///
/// One surface shows one page at a time and is used strictly sequentially.
#[async_trait]
pub trait PageSurface: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Poll until `selector` matches anywhere in the page, including inside
    /// shadow roots. Returns false on timeout.
    async fn wait_until_ready(&mut self, selector: &str, timeout: Duration) -> bool;

    /// Capture the current page with all of its shadow roots.
    async fn snapshot(&mut self) -> Result<PageSnapshot, SurfaceError>;

    /// Best-effort click on a cookie consent dialog.
    async fn dismiss_consent(&mut self) -> bool;

    async fn close(&mut self);
}
