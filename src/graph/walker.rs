use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use url::Url;

use crate::common::CitedArticleRecord;
use crate::extract::{parse_page_links, parse_results};
use crate::fetch::{Pacing, PageFetcher};

/// The paper whose citing articles are being listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginPaper {
    pub title: String,
    pub url: Option<String>,
    /// Seed cited-by page
    pub cited_by_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    pub records: Vec<CitedArticleRecord>,
    pub pages_visited: usize,
    pub pages_failed: usize,
}

/// List every citing article reachable from the origin's cited-by page.
///
/// The page links are read once from the seed page's navigation bar rather
/// than followed page to page, and each URL is visited at most once. Each
/// emitted record carries the citing article's own cited-by URL so the caller
/// can seed the next hop. Only a failure to load the seed page is an error.
pub async fn walk_cited_by<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    origin: &OriginPaper,
    base: &Url,
    pacing: &Pacing,
) -> Result<WalkReport> {
    let seed = origin.cited_by_url.as_str();
    let seed_html = fetcher
        .fetch(seed)
        .await
        .with_context(|| format!("Failed to load cited-by page {}", seed))?;
    pacing.wait().await;

    let page_links = parse_page_links(&seed_html, base);
    if page_links.is_empty() {
        debug!("No navigation bar on {}; using only the first page", seed);
    }

    let mut report = WalkReport::default();
    let mut visited: HashSet<String> = HashSet::new();

    visited.insert(seed.to_string());
    info!("Processing page: {}", seed);
    collect_page(&seed_html, origin, base, &mut report);

    for link in page_links {
        if !visited.insert(link.clone()) {
            debug!("Already visited {}. Skipping.", link);
            continue;
        }

        info!("Processing page: {}", link);
        let page = fetcher.fetch(&link).await;
        pacing.wait().await;
        match page {
            Ok(html) => collect_page(&html, origin, base, &mut report),
            Err(e) => {
                warn!("Error loading page {}: {:#}", link, e);
                report.pages_failed += 1;
            }
        }
    }

    Ok(report)
}

fn collect_page(html: &str, origin: &OriginPaper, base: &Url, report: &mut WalkReport) {
    report.pages_visited += 1;
    for result in parse_results(html, base) {
        report.records.push(CitedArticleRecord {
            origin_title: origin.title.clone(),
            origin_url: origin.url.clone(),
            origin_cited_page_url: origin.cited_by_url.clone(),
            title: result.listing_title,
            url: result.link,
            next_cited_by_url: result.cited_by_url,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;

    const SEED: &str = "https://scholar.google.com/scholar?cites=1";
    const P2: &str = "https://scholar.google.com/scholar?start=10&cites=1";
    const P3: &str = "https://scholar.google.com/scholar?start=20&cites=1";
    const P4: &str = "https://scholar.google.com/scholar?start=30&cites=1";

    fn results_page(nav: &str, titles: &[&str]) -> String {
        let results: String = titles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                format!(
                    r#"<div class="gs_r gs_or gs_scl">
                       <h3 class="gs_rt"><a href="https://x.test/{i}">{t}</a></h3>
                       <div class="gs_fl"><a href="/scholar?cites={i}00">Cited by {i}</a></div>
                       </div>"#,
                    i = i,
                    t = t
                )
            })
            .collect();
        format!("<html><body>{}<div id=\"gs_nml\">{}</div></body></html>", results, nav)
    }

    fn nav(links: &[&str]) -> String {
        links
            .iter()
            .map(|l| format!(r#"<a class="gs_nma" href="{}">n</a>"#, l.replace('&', "&amp;")))
            .collect()
    }

    fn origin() -> OriginPaper {
        OriginPaper {
            title: "Seed Paper".to_string(),
            url: Some("https://x.test/seed".to_string()),
            cited_by_url: SEED.to_string(),
        }
    }

    fn base() -> Url {
        Url::parse("https://scholar.google.com").unwrap()
    }

    #[tokio::test]
    async fn test_visits_seed_plus_listed_pages_once() {
        let seed_nav = nav(&[P2, P3, P2, SEED, P4]);
        let mut fetcher = StaticFetcher::new()
            .with_page(SEED, &results_page(&seed_nav, &["A", "B"]))
            .with_page(P2, &results_page(&seed_nav, &["C"]))
            .with_page(P3, &results_page(&seed_nav, &["D"]))
            .with_page(P4, &results_page("", &["E"]));

        let report = walk_cited_by(&mut fetcher, &origin(), &base(), &Pacing::none())
            .await
            .unwrap();

        assert_eq!(report.pages_visited, 4);
        assert_eq!(fetcher.requests.len(), 4);
        for url in [SEED, P2, P3, P4] {
            assert_eq!(fetcher.requests_for(url), 1, "{} fetched more than once", url);
        }

        let titles: Vec<_> = report.records.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);

        let first = &report.records[0];
        assert_eq!(first.origin_title, "Seed Paper");
        assert_eq!(first.origin_url.as_deref(), Some("https://x.test/seed"));
        assert_eq!(first.origin_cited_page_url, SEED);
        assert_eq!(first.url.as_deref(), Some("https://x.test/0"));
        assert_eq!(
            first.next_cited_by_url.as_deref(),
            Some("https://scholar.google.com/scholar?cites=000")
        );
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let mut fetcher = StaticFetcher::new()
            .with_page(SEED, &results_page(&nav(&[P2, P3]), &["A"]))
            .with_page(P3, &results_page("", &["C"]));

        let report = walk_cited_by(&mut fetcher, &origin(), &base(), &Pacing::none())
            .await
            .unwrap();

        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.records.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_failure_is_an_error() {
        let mut fetcher = StaticFetcher::new();
        assert!(walk_cited_by(&mut fetcher, &origin(), &base(), &Pacing::none())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_single_page_without_navigation() {
        let mut fetcher =
            StaticFetcher::new().with_page(SEED, "<html><body><p>No citations</p></body></html>");

        let report = walk_cited_by(&mut fetcher, &origin(), &base(), &Pacing::none())
            .await
            .unwrap();
        assert_eq!(report.pages_visited, 1);
        assert!(report.records.is_empty());
    }
}
