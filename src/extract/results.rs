use anyhow::Result;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::html::{clean_text, joined_text, non_empty, selector, stripped_text};
use super::normalize::{match_key, normalize_title};
use crate::common::AuthorLinks;
use crate::fetch::absolute_url;

lazy_static! {
    static ref RESULT: Selector = selector("div.gs_r.gs_or.gs_scl");
    static ref RESULT_TITLE: Selector = selector("h3.gs_rt");
    static ref LINK: Selector = selector("a");
    static ref SNIPPET_PARAGRAPH: Selector = selector(".gsh_csp");
    static ref SNIPPET: Selector = selector(".gs_rs");
    static ref SNIPPET_FULL_TEXT: Selector = selector(".gs_fma_snp");
    static ref AUTHOR_LINE: Selector = selector("div.gs_a, div.gs_fmaa");
    static ref PAGE_LINK: Selector = selector("#gs_nml a.gs_nma");
}

/// Anchor texts that introduce a result's cited-by link
pub const CITED_BY_PREFIXES: &[&str] = &["Cited by", "被引用次数"];

/// One entry of a search or cited-by results page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Normalized title, used for matching
    pub title: Option<String>,
    /// Title text as listed, tags included, joined with single spaces
    pub listing_title: Option<String>,
    /// Target of the title link, as given
    pub link: Option<String>,
    pub abstract_text: Option<String>,
    pub cited_by_url: Option<String>,
    pub authors: AuthorLinks,
}

/// How a search result was chosen for a query title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Normalized titles are equal ignoring case
    Exact,
    /// No exact match, but the search returned exactly one result
    SoleResult,
}

/// Scholar search URL for a free-text query
pub fn scholar_search_url(base: &Url, query: &str) -> Result<String> {
    let mut url = base.join("/scholar")?;
    url.query_pairs_mut().append_pair("hl", "en").append_pair("q", query);
    Ok(url.into())
}

pub fn parse_results(html: &str, base: &Url) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT)
        .map(|result| parse_result(result, base))
        .collect()
}

fn parse_result(result: ElementRef<'_>, base: &Url) -> SearchResult {
    let heading = result.select(&RESULT_TITLE).next();

    let title = heading
        .map(|h| normalize_title(&h.text().collect::<String>()))
        .and_then(non_empty);
    let listing_title = heading.and_then(|h| non_empty(joined_text(h, " ")));
    let link = heading
        .and_then(|h| h.select(&LINK).next())
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    SearchResult {
        title,
        listing_title,
        link,
        abstract_text: extract_abstract(result),
        cited_by_url: extract_cited_by(result, base),
        authors: extract_authors(result, base),
    }
}

/// Snippet layouts differ between plain results and full-text ("fma") results
fn extract_abstract(result: ElementRef<'_>) -> Option<String> {
    if let Some(paragraph) = result.select(&SNIPPET_PARAGRAPH).next() {
        return clean_text(paragraph);
    }
    if let Some(snippet) = result.select(&SNIPPET).next() {
        return non_empty(joined_text(snippet, " ").replace('\u{a0}', " "));
    }
    result
        .select(&SNIPPET_FULL_TEXT)
        .next()
        .and_then(|full| non_empty(joined_text(full, " ").replace('\u{a0}', " ")))
}

fn extract_cited_by(result: ElementRef<'_>, base: &Url) -> Option<String> {
    result
        .select(&LINK)
        .find(|a| {
            let text = a.text().collect::<String>();
            let text = text.trim();
            CITED_BY_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
        })
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolute_url(base, href))
}

fn extract_authors(result: ElementRef<'_>, base: &Url) -> AuthorLinks {
    let Some(line) = result.select(&AUTHOR_LINE).next() else {
        return AuthorLinks::new();
    };

    line.select(&LINK)
        .filter_map(|a| {
            let name = stripped_text(a);
            if name.is_empty() {
                return None;
            }
            let url = a.value().attr("href").and_then(|href| absolute_url(base, href));
            Some((name, url))
        })
        .collect()
}

/// Page links listed once in a cited-by page's navigation bar, in order
pub fn parse_page_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&PAGE_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| absolute_url(base, href))
        .collect()
}

/// Pick the result that verifies `query`.
///
/// The first result whose normalized title equals the normalized query
/// (ignoring case) wins; otherwise a lone result is accepted as a fallback.
pub fn select_match<'a>(
    query: &str,
    results: &'a [SearchResult],
) -> Option<(&'a SearchResult, MatchKind)> {
    let key = match_key(query);

    let exact = results
        .iter()
        .find(|result| result.title.as_deref().map(match_key).as_deref() == Some(key.as_str()));
    if let Some(result) = exact {
        return Some((result, MatchKind::Exact));
    }

    match results {
        [only] => Some((only, MatchKind::SoleResult)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://scholar.google.com").unwrap()
    }

    fn result_html(title: &str, extra: &str) -> String {
        format!(
            r#"<div class="gs_r gs_or gs_scl"><div class="gs_ri">
                <h3 class="gs_rt">{}</h3>
                <div class="gs_a">
                  <a href="/citations?user=u1">A Author</a>,
                  <a href="/citations?user=u2">B Writer</a> - Journal, 2020
                </div>
                {}
                <div class="gs_fl">
                  <a href="/scholar?cites=42&amp;hl=en">Cited by 17</a>
                  <a href="/scholar?related">Related articles</a>
                </div>
            </div></div>"#,
            title, extra
        )
    }

    fn page(results: &[String]) -> String {
        format!(
            "<html><body><div id=\"gs_res_ccl_mid\">{}</div></body></html>",
            results.concat()
        )
    }

    #[test]
    fn test_scholar_search_url() {
        assert_eq!(
            scholar_search_url(&base(), "Deep Learning: a Survey").unwrap(),
            "https://scholar.google.com/scholar?hl=en&q=Deep+Learning%3A+a+Survey"
        );
    }

    #[test]
    fn test_parse_result_fields() {
        let html = page(&[result_html(
            concat!(
                r#"<span class="gs_ctc">[CITATION]</span> "#,
                r#"<a href="https://example.org/dl">Deep <b>Learning</b> Survey</a>"#
            ),
            r#"<div class="gs_rs">We survey&nbsp;deep<br>learning.</div>"#,
        )]);

        let results = parse_results(&html, &base());
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.title.as_deref(), Some("Deep Learning Survey"));
        assert_eq!(r.listing_title.as_deref(), Some("[CITATION] Deep Learning Survey"));
        assert_eq!(r.link.as_deref(), Some("https://example.org/dl"));
        assert_eq!(r.abstract_text.as_deref(), Some("We survey deep learning."));
        assert_eq!(
            r.cited_by_url.as_deref(),
            Some("https://scholar.google.com/scholar?cites=42&hl=en")
        );
        assert_eq!(r.authors.len(), 2);
        assert_eq!(
            r.authors.get("A Author"),
            Some(&Some("https://scholar.google.com/citations?user=u1".to_string()))
        );
    }

    #[test]
    fn test_abstract_prefers_paragraph_snippets() {
        let html = page(&[result_html(
            "<a href=\"#\">T</a>",
            concat!(
                r#"<div class="gs_fma_snp"><div class="gsh_csp">First paragraph.</div></div>"#,
                r#"<div class="gs_rs">Short</div>"#
            ),
        )]);
        let results = parse_results(&html, &base());
        assert_eq!(results[0].abstract_text.as_deref(), Some("First paragraph."));
    }

    #[test]
    fn test_chinese_cited_by_label() {
        let result = r#"<div class="gs_r gs_or gs_scl gs_fmar">
            <h3 class="gs_rt">T</h3><a href="/scholar?cites=9">被引用次数：3</a>
        </div>"#;
        let html = page(&[result.to_string()]);
        let results = parse_results(&html, &base());
        assert_eq!(
            results[0].cited_by_url.as_deref(),
            Some("https://scholar.google.com/scholar?cites=9")
        );
        assert!(results[0].authors.is_empty());
        assert_eq!(results[0].abstract_text, None);
    }

    #[test]
    fn test_parse_page_links() {
        let html = r#"<div id="gs_nml">
            <a class="gs_nma" href="/scholar?start=10&amp;cites=1">2</a>
            <a class="gs_nma" href="/scholar?start=20&amp;cites=1">3</a>
        </div>"#;
        assert_eq!(
            parse_page_links(html, &base()),
            vec![
                "https://scholar.google.com/scholar?start=10&cites=1",
                "https://scholar.google.com/scholar?start=20&cites=1",
            ]
        );
        assert!(parse_page_links("<p></p>", &base()).is_empty());
    }

    fn titled(title: &str) -> SearchResult {
        SearchResult {
            title: Some(normalize_title(title)),
            ..SearchResult::default()
        }
    }

    #[test]
    fn test_exact_match_ignores_case_and_punctuation() {
        let results = vec![titled("Other Paper"), titled("\u{201C}deep learning SURVEY\u{201D}")];
        let (matched, kind) = select_match("Deep Learning Survey", &results).unwrap();
        assert_eq!(kind, MatchKind::Exact);
        assert_eq!(matched.title.as_deref(), Some("deep learning SURVEY"));
    }

    #[test]
    fn test_single_candidate_is_matched() {
        let results = vec![titled("Deep Learning Survey")];
        let (matched, kind) = select_match("Deep Learning Survey", &results).unwrap();
        assert_eq!(kind, MatchKind::Exact);
        assert_eq!(matched.title.as_deref(), Some("Deep Learning Survey"));

        let results = vec![titled("A Survey of Deep Learning")];
        let (matched, kind) = select_match("Deep Learning Survey", &results).unwrap();
        assert_eq!(kind, MatchKind::SoleResult);
        assert_eq!(matched.title.as_deref(), Some("A Survey of Deep Learning"));
    }

    #[test]
    fn test_ambiguous_results_do_not_match() {
        let results = vec![titled("Deep Learning"), titled("Learning Surveys")];
        assert!(select_match("Deep Learning Survey", &results).is_none());
        assert!(select_match("Deep Learning Survey", &[]).is_none());
    }
}
