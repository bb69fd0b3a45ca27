use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};

use super::{Pacing, PageFetcher};
use crate::extract::{article_rows, has_more_articles, profile_page_url};

/// Rows requested per profile page when expanding without a browser
pub const PROFILE_PAGE_SIZE: usize = 100;

/// Result of one attempt to press a page's "show more" control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The control was pressed; more rows are loading
    Clicked,
    /// The control reports itself disabled: everything is loaded
    Disabled,
    /// No control on the page
    Missing,
    /// Something covered the control or the click was otherwise rejected
    Intercepted,
}

/// A page's "show more" control
#[async_trait]
pub trait MoreControl: Send {
    async fn click_more(&mut self) -> ClickOutcome;
}

/// How patiently to expand a list
#[derive(Debug, Clone)]
pub struct ExpandPolicy {
    /// Wait for the next chunk to render after a successful click
    pub after_click: Pacing,
    /// Wait before retrying an intercepted click
    pub after_intercept: Pacing,
    /// Consecutive intercepted clicks tolerated before giving up
    pub max_intercepts: u32,
    /// Upper bound on successful clicks for one page
    pub max_clicks: u32,
}

impl Default for ExpandPolicy {
    fn default() -> Self {
        Self {
            after_click: Pacing::fixed(3.0),
            after_intercept: Pacing::fixed(2.0),
            max_intercepts: 5,
            max_clicks: 500,
        }
    }
}

impl ExpandPolicy {
    /// Same limits, no waiting
    pub fn immediate() -> Self {
        Self {
            after_click: Pacing::none(),
            after_intercept: Pacing::none(),
            ..Self::default()
        }
    }
}

/// Why expansion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandEnd {
    Disabled,
    Missing,
    TooManyIntercepts,
    ClickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandReport {
    pub clicks: u32,
    pub intercepts: u32,
    pub end: ExpandEnd,
}

/// Press "show more" until the control is disabled or gone.
///
/// Intercepted clicks are retried after a delay, at most
/// `policy.max_intercepts` times in a row. Whatever has loaded by then is kept.
pub async fn expand_all<C: MoreControl + ?Sized>(
    control: &mut C,
    policy: &ExpandPolicy,
) -> ExpandReport {
    let mut clicks = 0;
    let mut intercepts = 0;
    let mut consecutive_intercepts = 0;

    let end = loop {
        if clicks >= policy.max_clicks {
            warn!("Stopped expanding after {} clicks", clicks);
            break ExpandEnd::ClickLimit;
        }

        match control.click_more().await {
            ClickOutcome::Clicked => {
                clicks += 1;
                consecutive_intercepts = 0;
                debug!("Clicked 'Show more' ({} so far)", clicks);
                policy.after_click.wait().await;
            }
            ClickOutcome::Disabled => {
                debug!("'Show more' is disabled; all rows loaded");
                break ExpandEnd::Disabled;
            }
            ClickOutcome::Missing => {
                debug!("'Show more' is no longer available");
                break ExpandEnd::Missing;
            }
            ClickOutcome::Intercepted => {
                intercepts += 1;
                consecutive_intercepts += 1;
                if consecutive_intercepts > policy.max_intercepts {
                    warn!(
                        "'Show more' click intercepted {} times in a row; keeping the loaded rows",
                        consecutive_intercepts
                    );
                    break ExpandEnd::TooManyIntercepts;
                }
                debug!("'Show more' click intercepted, retrying...");
                policy.after_intercept.wait().await;
            }
        }
    };

    ExpandReport { clicks, intercepts, end }
}

/// Load a profile's full article list through its paged URLs.
///
/// The first page is returned with the rows of every later page spliced in,
/// so it parses like a fully expanded profile. Paging stops once the "show
/// more" control is disabled or gone, a page comes back empty, or
/// `policy.max_clicks` pages were added. A failed later page keeps the rows
/// loaded so far; only a failed first page is an error.
pub async fn expand_by_paging<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    profile_url: &str,
    policy: &ExpandPolicy,
) -> Result<String> {
    let html = fetcher
        .fetch(&profile_page_url(profile_url, 0, PROFILE_PAGE_SIZE)?)
        .await?;

    let mut loaded = article_rows(&html).len();
    let mut more = has_more_articles(&html);
    let mut extra_rows = Vec::new();
    let mut pages = 0;

    while more && loaded > 0 {
        if pages >= policy.max_clicks {
            warn!("Stopped paging {} after {} extra pages", profile_url, pages);
            break;
        }
        policy.after_click.wait().await;

        let page_url = profile_page_url(profile_url, loaded, PROFILE_PAGE_SIZE)?;
        let page = match fetcher.fetch(&page_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to load {}: {:#}; keeping {} articles", page_url, e, loaded);
                break;
            }
        };
        pages += 1;

        let rows = article_rows(&page);
        if rows.is_empty() {
            break;
        }
        loaded += rows.len();
        more = has_more_articles(&page);
        extra_rows.extend(rows);
    }

    if pages > 0 {
        info!("Loaded {} articles from {} pages of {}", loaded, pages + 1, profile_url);
    }
    Ok(splice_rows(html, &extra_rows))
}

fn splice_rows(mut html: String, rows: &[String]) -> String {
    if rows.is_empty() {
        return html;
    }
    let table = format!("<table><tbody>{}</tbody></table>", rows.concat());
    match html.rfind("</body>") {
        Some(pos) => html.insert_str(pos, &table),
        None => html.push_str(&table),
    }
    html
}
