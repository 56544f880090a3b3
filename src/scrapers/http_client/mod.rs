//! Shared HTTP client for document downloads.

mod user_agent;

pub use user_agent::{random_user_agent, resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::Duration;

use reqwest::{Client, Response};
use url::Url;

/// Thin wrapper over `reqwest::Client` carrying the resolved user agent so
/// the browser session can present the same identity.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    /// Build a client.
    /// - `user_agent_config`: see [`resolve_user_agent`]
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, user_agent })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Issue a GET. Non-success statuses are returned, not turned into errors.
    pub async fn get(&self, url: &Url) -> Result<Response, reqwest::Error> {
        self.client.get(url.clone()).send().await
    }
}
