use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use super::{expand_all, ClickOutcome, ExpandPolicy, FetchConfig, MoreControl, PageFetcher};

/// CSS selector of the profile page's "Show more" button
const SHOW_MORE_SELECTOR: &str = "#gsc_bpf_more";

/// Drives one Chrome tab for the whole stage run
pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    expand: ExpandPolicy,
}

impl BrowserFetcher {
    pub async fn launch(config: &FetchConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder().request_timeout(config.timeout);
        if config.show_browser {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(|e| anyhow!(e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch Chrome")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("Launched browser session");
        Ok(Self {
            browser,
            handler,
            page: None,
            expand: config.expand.clone(),
        })
    }

    async fn navigate(&mut self, url: &str) -> Result<Page> {
        if self.page.is_none() {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .context("Failed to open browser tab")?;
            self.page = Some(page);
        }
        let page = self.page.clone().context("Browser tab unavailable")?;

        debug!("Navigating to {}", url);
        page.goto(url)
            .await
            .with_context(|| format!("Navigation failed for {}", url))?;
        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&mut self, url: &str) -> Result<String> {
        let page = self.navigate(url).await?;
        page.content()
            .await
            .with_context(|| format!("Failed to read page source of {}", url))
    }

    async fn fetch_expanded(&mut self, url: &str) -> Result<String> {
        let page = self.navigate(url).await?;

        let mut control = ShowMoreButton { page: page.clone() };
        let report = expand_all(&mut control, &self.expand).await;
        debug!(
            "Expanded {} with {} clicks ({} intercepted), stopped: {:?}",
            url, report.clicks, report.intercepts, report.end
        );

        page.content()
            .await
            .with_context(|| format!("Failed to read page source of {}", url))
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

struct ShowMoreButton {
    page: Page,
}

#[async_trait]
impl MoreControl for ShowMoreButton {
    async fn click_more(&mut self) -> ClickOutcome {
        let button = match self.page.find_element(SHOW_MORE_SELECTOR).await {
            Ok(button) => button,
            Err(_) => return ClickOutcome::Missing,
        };

        match button.attribute("disabled").await {
            Ok(Some(_)) => return ClickOutcome::Disabled,
            Ok(None) => {}
            Err(e) => {
                debug!("Could not read 'Show more' state: {}", e);
                return ClickOutcome::Intercepted;
            }
        }

        match button.click().await {
            Ok(_) => ClickOutcome::Clicked,
            Err(e) => {
                debug!("'Show more' click rejected: {}", e);
                ClickOutcome::Intercepted
            }
        }
    }
}
