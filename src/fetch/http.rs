use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use super::{expand_by_paging, ExpandPolicy, PageFetcher};

/// Fixed desktop User-Agent sent with every plain HTTP request
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
);

/// Create an HTTP client configured for scraping listing pages
pub fn create_scrape_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fetches static pages with a plain GET.
///
/// Profile article lists are expanded by requesting their paged URLs in turn
/// instead of pressing "show more".
pub struct HttpFetcher {
    client: Client,
    expand: ExpandPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, expand: ExpandPolicy) -> Result<Self> {
        let client = create_scrape_client(timeout).context("Failed to build HTTP client")?;
        Ok(Self { client, expand })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} for {}", status, url);
        }

        resp.text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }

    async fn fetch_expanded(&mut self, url: &str) -> Result<String> {
        let policy = self.expand.clone();
        expand_by_paging(self, url, &policy).await
    }
}
