//! Page fetchers: how a stage turns a URL into HTML.

#[cfg(feature = "browser")]
pub mod browser;
pub mod expand;
pub mod http;
pub mod pacing;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use std::time::Duration;
use url::Url;

pub use expand::{
    expand_all, expand_by_paging, ClickOutcome, ExpandEnd, ExpandPolicy, ExpandReport, MoreControl,
    PROFILE_PAGE_SIZE,
};
pub use http::{create_scrape_client, HttpFetcher, USER_AGENT};
pub use pacing::Pacing;

/// Default origin of every scraped page
pub const DEFAULT_BASE_URL: &str = "https://scholar.google.com";

/// Source of page HTML for one stage run.
///
/// A fetcher owns the single HTTP or browser session of the run and is used
/// strictly sequentially.
#[async_trait]
pub trait PageFetcher: Send {
    /// Load a page and return its HTML
    async fn fetch(&mut self, url: &str) -> Result<String>;

    /// Load a page whose list is grown client-side by a "show more" control,
    /// expanding it fully before returning the HTML
    async fn fetch_expanded(&mut self, url: &str) -> Result<String> {
        self.fetch(url).await
    }

    /// Release the session
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Which fetcher implementation a stage drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetcherKind {
    /// Plain HTTP GET with a fixed User-Agent
    Http,
    /// Headless Chrome (requires the `browser` feature)
    Browser,
}

/// Settings shared by both fetcher implementations
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub kind: FetcherKind,
    pub timeout: Duration,
    /// Show the browser window instead of running headless
    pub show_browser: bool,
    pub expand: ExpandPolicy,
}

/// Build the fetcher selected by `config.kind`
pub async fn build_fetcher(config: &FetchConfig) -> Result<Box<dyn PageFetcher>> {
    match config.kind {
        FetcherKind::Http => {
            let fetcher = HttpFetcher::new(config.timeout, config.expand.clone())?;
            Ok(Box::new(fetcher))
        }
        #[cfg(feature = "browser")]
        FetcherKind::Browser => Ok(Box::new(browser::BrowserFetcher::launch(config).await?)),
        #[cfg(not(feature = "browser"))]
        FetcherKind::Browser => {
            anyhow::bail!(
                "Browser fetcher requested but this binary was built without the `browser` feature"
            )
        }
    }
}

/// Resolve `href` against the site origin, leaving absolute links untouched
pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

#[cfg(test)]
pub mod testing {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    use super::PageFetcher;

    /// Serves canned pages by URL and records every request
    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        pub requests: Vec<String>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub fn requests_for(&self, url: &str) -> usize {
            self.requests.iter().filter(|u| u.as_str() == url).count()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&mut self, url: &str) -> Result<String> {
            self.requests.push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("connection reset while loading {}", url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url() {
        let base = Url::parse(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            absolute_url(&base, "/citations?user=abc&hl=en").as_deref(),
            Some("https://scholar.google.com/citations?user=abc&hl=en")
        );
        assert_eq!(
            absolute_url(&base, "https://example.org/paper.pdf").as_deref(),
            Some("https://example.org/paper.pdf")
        );
        assert_eq!(absolute_url(&base, "  "), None);
    }

    #[tokio::test]
    async fn test_static_fetcher_through_box() {
        let mut fetcher: Box<dyn PageFetcher> =
            Box::new(testing::StaticFetcher::new().with_page("https://a.test/", "<p>ok</p>"));
        assert_eq!(fetcher.fetch("https://a.test/").await.unwrap(), "<p>ok</p>");
        assert_eq!(fetcher.fetch_expanded("https://a.test/").await.unwrap(), "<p>ok</p>");
        assert!(fetcher.fetch("https://a.test/missing").await.is_err());
    }
}
