//! Chromium-backed page surface.
//!
//! Uses chromiumoxide (CDP) to render pages whose content lives inside
//! web components, then captures them through in-page scripts.

mod config;
mod scripts;

pub use config::{default_headless, default_timeout, BrowserEngineConfig};
pub use scripts::{readiness_probe, CAPTURE_BOUNDARIES, DISMISS_CONSENT};

use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

use super::{PageSurface, SurfaceError};
use crate::dom::PageSnapshot;

#[cfg(feature = "browser")]
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One browser with one tab, navigated in place.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    config: BrowserEngineConfig,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch (or connect to) a browser and open the working tab.
    pub async fn launch(config: BrowserEngineConfig, user_agent: &str) -> Result<Self, SurfaceError> {
        let (browser, mut handler) = match config.remote_url.clone() {
            Some(remote_url) => Self::connect_remote(&config, &remote_url).await?,
            None => Self::launch_local(&config).await?,
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SurfaceError::Setup(format!("failed to open tab: {}", e)))?;

        page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
            .await
            .map_err(|e| SurfaceError::Setup(format!("failed to set user agent: {}", e)))?;

        Ok(Self {
            config,
            browser,
            page,
            handler,
        })
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<std::path::PathBuf, SurfaceError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(SurfaceError::Setup(
            "Chrome/Chromium not found. Install it or set browser.remote_url".to_string(),
        ))
    }

    async fn launch_local(
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, chromiumoxide::handler::Handler), SurfaceError> {
        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(Self::find_chrome()?)
            .request_timeout(Duration::from_secs(config.timeout));

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| SurfaceError::Setup(format!("invalid browser config: {}", e)))?;

        Browser::launch(browser_config)
            .await
            .map_err(|e| SurfaceError::Setup(format!("failed to launch browser: {}", e)))
    }

    /// Connect to a remote Chrome instance via its `/json/version` endpoint.
    async fn connect_remote(
        config: &BrowserEngineConfig,
        url: &str,
    ) -> Result<(Browser, chromiumoxide::handler::Handler), SurfaceError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let setup = |e: reqwest::Error| SurfaceError::Setup(format!("remote browser: {}", e));
        let version: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(setup)?
            .json()
            .await
            .map_err(setup)?;

        let ws_url = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SurfaceError::Setup("no webSocketDebuggerUrl in response".to_string()))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| SurfaceError::Setup(format!("failed to connect to remote browser: {}", e)))
    }

    async fn probe(&self, expression: &str) -> Result<bool, SurfaceError> {
        self.page
            .evaluate(expression.to_string())
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))?
            .into_value::<bool>()
            .map_err(|e| SurfaceError::Script(e.to_string()))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageSurface for BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| SurfaceError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_until_ready(&mut self, selector: &str, timeout: Duration) -> bool {
        let expression = readiness_probe(selector);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.probe(&expression).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => debug!("Readiness probe failed: {}", e),
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, SurfaceError> {
        let snapshot: PageSnapshot = self
            .page
            .evaluate(CAPTURE_BOUNDARIES.to_string())
            .await
            .map_err(|e| SurfaceError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| SurfaceError::Script(e.to_string()))?;

        debug!(
            "Captured {} with {} boundaries",
            snapshot.url,
            snapshot.boundaries.len()
        );
        Ok(snapshot)
    }

    async fn dismiss_consent(&mut self) -> bool {
        match self.probe(DISMISS_CONSENT).await {
            Ok(clicked) => {
                if clicked {
                    info!("Accepted cookie consent dialog");
                } else {
                    debug!("No cookie consent dialog found");
                }
                clicked
            }
            Err(e) => {
                warn!("Cookie consent dismissal failed: {}", e);
                false
            }
        }
    }

    async fn close(&mut self) {
        if self.config.remote_url.is_none() {
            if let Err(e) = self.browser.close().await {
                debug!("Browser close returned: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler.abort();
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserSession {
    _config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub async fn launch(
        _config: BrowserEngineConfig,
        _user_agent: &str,
    ) -> Result<Self, SurfaceError> {
        Err(SurfaceError::Setup(
            "browser support not compiled; rebuild with --features browser".to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageSurface for BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::Navigation {
            url: url.to_string(),
            message: "browser support not compiled".to_string(),
        })
    }

    async fn wait_until_ready(&mut self, _selector: &str, _timeout: Duration) -> bool {
        false
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, SurfaceError> {
        Err(SurfaceError::Script("browser support not compiled".to_string()))
    }

    async fn dismiss_consent(&mut self) -> bool {
        false
    }

    async fn close(&mut self) {}
}
