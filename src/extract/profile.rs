use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, warn};
use scraper::{Html, Selector};
use url::Url;

use super::html::{
    bar_year_index, joined_text, leading_number, non_empty, selector, stripped_text,
};
use crate::common::{parse_count, AnnualCitations, ArticleRef, ResearcherRecord};
use crate::fetch::absolute_url;

lazy_static! {
    static ref AUTHOR_RESULT_LINK: Selector = selector(".gs_ai_t h3.gs_ai_name a");
    static ref POSITION_LINE: Selector = selector("div.gsc_prf_il");
    static ref INSTITUTION_LINK: Selector = selector("a.gsc_prf_ila");
    static ref HOMEPAGE_LINK: Selector = selector("#gsc_prf_ivh a[rel=\"nofollow\"]");
    static ref INTEREST_LINK: Selector = selector("#gsc_prf_int a.gsc_prf_inta");
    static ref METRIC_ROW: Selector = selector("table#gsc_rsb_st tbody tr");
    static ref METRIC_LABEL: Selector = selector("td.gsc_rsb_sc1");
    static ref METRIC_VALUE: Selector = selector("td.gsc_rsb_std");
    static ref HISTOGRAM: Selector = selector("div.gsc_md_hist_b");
    static ref HISTOGRAM_YEAR: Selector = selector("span.gsc_g_t");
    static ref HISTOGRAM_COUNT: Selector = selector("a.gsc_g_a");
    static ref ACCESS_BOX: Selector = selector("div.gsc_rsb_m");
    static ref ACCESS_AVAILABLE: Selector = selector("div.gsc_rsb_m_a span");
    static ref ACCESS_UNAVAILABLE: Selector = selector("div.gsc_rsb_m_na div");
    static ref ARTICLE_ROW: Selector = selector("tr.gsc_a_tr");
    static ref ARTICLE_TITLE: Selector = selector("a.gsc_a_at");
    static ref ARTICLE_YEAR: Selector = selector("td.gsc_a_y span.gsc_a_h");
    static ref SHOW_MORE: Selector = selector("#gsc_bpf_more");
}

const POSITION_KEYWORDS: &[&str] = &["professor", "prof", "director", "head"];
const INSTITUTION_KEYWORDS: &[&str] = &["institute", "university", "school", "college", "campus"];

/// Author-search URL for a researcher name
pub fn author_search_url(base: &Url, name: &str) -> Result<String> {
    let mut url = base.join("/citations")?;
    url.query_pairs_mut()
        .append_pair("view_op", "search_authors")
        .append_pair("hl", "en")
        .append_pair("oi", "ao")
        .append_pair("mauthors", name);
    Ok(url.into())
}

/// One page of a profile's article list, `pagesize` rows starting at `cstart`
pub fn profile_page_url(profile_url: &str, cstart: usize, pagesize: usize) -> Result<String> {
    let mut url = Url::parse(profile_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| *key != "cstart" && *key != "pagesize")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("cstart", &cstart.to_string())
        .append_pair("pagesize", &pagesize.to_string());
    Ok(url.into())
}

/// Markup of every article row on a profile page
pub fn article_rows(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document.select(&ARTICLE_ROW).map(|row| row.html()).collect()
}

/// Whether the profile's "show more" control is present and enabled
pub fn has_more_articles(html: &str) -> bool {
    let document = Html::parse_document(html);
    document
        .select(&SHOW_MORE)
        .next()
        .is_some_and(|button| button.value().attr("disabled").is_none())
}

/// Profile URL of the first author-search result
pub fn parse_author_search(html: &str, base: &Url) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&AUTHOR_RESULT_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolute_url(base, href))
}

/// Extract a researcher profile; every field is optional
pub fn parse_profile(html: &str, base: &Url, name: &str, profile_url: &str) -> ResearcherRecord {
    let document = Html::parse_document(html);

    let mut record = ResearcherRecord {
        name: name.to_string(),
        profile_url: profile_url.to_string(),
        ..ResearcherRecord::default()
    };

    extract_affiliation(&document, base, &mut record);

    record.personal_website = document
        .select(&HOMEPAGE_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);

    record.research_areas = document
        .select(&INTEREST_LINK)
        .map(stripped_text)
        .filter(|area| !area.is_empty())
        .collect();

    extract_metrics(&document, &mut record);
    record.annual_citations = extract_annual_citations(&document);
    record.public_access_articles = extract_public_access(&document);
    record.articles = extract_articles(&document, base);

    debug!(
        "Parsed profile of {}: {} articles, {} citation years",
        name,
        record.articles.len(),
        record.annual_citations.len()
    );
    record
}

fn extract_affiliation(document: &Html, base: &Url, record: &mut ResearcherRecord) {
    let Some(line) = document.select(&POSITION_LINE).next() else {
        return;
    };

    for part in stripped_text(line).split(',').map(str::trim) {
        let lower = part.to_lowercase();
        if POSITION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            record.position = Some(part.to_string());
        } else if INSTITUTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            record.institution = Some(part.to_string());
        }
    }

    if let Some(link) = line.select(&INSTITUTION_LINK).next() {
        record.institution_url = link
            .value()
            .attr("href")
            .and_then(|href| absolute_url(base, href));
        if record.institution.is_none() {
            record.institution = non_empty(stripped_text(link));
        }
    }
}

fn extract_metrics(document: &Html, record: &mut ResearcherRecord) {
    for row in document.select(&METRIC_ROW) {
        let Some(label) = row.select(&METRIC_LABEL).next() else {
            continue;
        };
        let value = row
            .select(&METRIC_VALUE)
            .next()
            .and_then(|td| parse_count(&stripped_text(td)));

        match stripped_text(label).as_str() {
            "Citations" => record.total_citations = value,
            "h-index" => record.h_index = value,
            "i10-index" => record.i10_index = value,
            _ => {}
        }
    }
}

fn extract_annual_citations(document: &Html) -> AnnualCitations {
    let Some(histogram) = document.select(&HISTOGRAM).next() else {
        return AnnualCitations::new();
    };

    let years: Vec<String> = histogram.select(&HISTOGRAM_YEAR).map(stripped_text).collect();
    let mut citations = AnnualCitations::new();
    for (position, bar) in histogram.select(&HISTOGRAM_COUNT).enumerate() {
        let year = years.get(bar_year_index(bar, position, years.len()));
        if let (Some(year), Some(count)) = (year, parse_count(&stripped_text(bar))) {
            citations.insert(year.clone(), count);
        }
    }
    citations
}

fn extract_public_access(document: &Html) -> Option<u64> {
    let public_access = document.select(&ACCESS_BOX).next()?;

    let available = public_access
        .select(&ACCESS_AVAILABLE)
        .next()
        .and_then(|span| leading_number(&joined_text(span, " ")))
        .unwrap_or(0);
    let unavailable = public_access
        .select(&ACCESS_UNAVAILABLE)
        .next()
        .and_then(|div| leading_number(&joined_text(div, " ")))
        .unwrap_or(0);

    Some(available + unavailable)
}

fn extract_articles(document: &Html, base: &Url) -> Vec<ArticleRef> {
    let mut articles = Vec::new();

    for (idx, row) in document.select(&ARTICLE_ROW).enumerate() {
        let Some(title_link) = row.select(&ARTICLE_TITLE).next() else {
            warn!("Error extracting article {}: no title link", idx + 1);
            continue;
        };

        let title = joined_text(title_link, " ");
        if title.is_empty() {
            warn!("Error extracting article {}: empty title", idx + 1);
            continue;
        }

        let year = row
            .select(&ARTICLE_YEAR)
            .next()
            .and_then(|span| non_empty(stripped_text(span)));
        let url = title_link
            .value()
            .attr("href")
            .and_then(|href| absolute_url(base, href));

        articles.push(ArticleRef { title, year, url });
    }

    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://scholar.google.com";

    const PROFILE: &str = r#"
    <html><body>
      <div id="gsc_prf_in">Ada Lovelace</div>
      <div class="gsc_prf_il">Professor of Mathematics,
        <a href="/citations?view_op=view_org&amp;org=123"
           class="gsc_prf_ila">University of London</a>
      </div>
      <div class="gsc_prf_il" id="gsc_prf_ivh">Verified email at london.ac.uk -
        <a href="https://ada.example.org/" rel="nofollow" class="gsc_prf_ila">Homepage</a>
      </div>
      <div class="gsc_prf_il" id="gsc_prf_int">
        <a class="gsc_prf_inta" href="javascript:void(0)">Analytical Engines</a>
        <a class="gsc_prf_inta" href="javascript:void(0)">Poetical Science</a>
      </div>
      <table id="gsc_rsb_st">
        <thead><tr><th></th><th>All</th><th>Since 2019</th></tr></thead>
        <tbody>
          <tr><td class="gsc_rsb_sc1"><a class="gsc_rsb_f">Citations</a></td>
            <td class="gsc_rsb_std">1,234</td><td class="gsc_rsb_std">400</td></tr>
          <tr><td class="gsc_rsb_sc1"><a class="gsc_rsb_f">h-index</a></td>
            <td class="gsc_rsb_std">12</td><td class="gsc_rsb_std">8</td></tr>
          <tr><td class="gsc_rsb_sc1"><a class="gsc_rsb_f">i10-index</a></td>
            <td class="gsc_rsb_std">15</td><td class="gsc_rsb_std">9</td></tr>
        </tbody>
      </table>
      <div class="gsc_md_hist_b">
        <span class="gsc_g_t">2022</span><span class="gsc_g_t">2023</span>
        <a class="gsc_g_a"><span class="gsc_g_al">30</span></a>
        <a class="gsc_g_a"><span class="gsc_g_al">45</span></a>
      </div>
      <div class="gsc_rsb_m">
        <div class="gsc_rsb_m_a"><span>3 articles</span></div>
        <div class="gsc_rsb_m_na"><div>2 articles</div></div>
      </div>
      <table id="gsc_a_t"><tbody id="gsc_a_b">
        <tr class="gsc_a_tr">
          <td class="gsc_a_t">
            <a href="/citations?view_op=view_citation&amp;citation_for_view=abc:1"
               class="gsc_a_at">Notes on the Analytical Engine</a>
          </td>
          <td class="gsc_a_y"><span class="gsc_a_h gsc_a_hc">1843</span></td>
        </tr>
        <tr class="gsc_a_tr">
          <td class="gsc_a_t"><span>Untitled row</span></td>
          <td class="gsc_a_y"><span class="gsc_a_h"></span></td>
        </tr>
        <tr class="gsc_a_tr">
          <td class="gsc_a_t">
            <a href="/citations?view_op=view_citation&amp;citation_for_view=abc:2"
               class="gsc_a_at">Sketch of the Engine</a>
          </td>
          <td class="gsc_a_y"><span class="gsc_a_h"></span></td>
        </tr>
      </tbody></table>
      <button id="gsc_bpf_more" disabled>Show more</button>
    </body></html>
    "#;

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    #[test]
    fn test_author_search_url_encoding() {
        let url = author_search_url(&base(), "Lovelace, Ada").unwrap();
        let expected = concat!(
            "https://scholar.google.com/citations",
            "?view_op=search_authors&hl=en&oi=ao&mauthors=Lovelace%2C+Ada"
        );
        assert_eq!(url, expected);
    }

    #[test]
    fn test_profile_page_url_replaces_paging() {
        let profile = "https://s.test/citations?user=abc&cstart=20&hl=en";
        let url = profile_page_url(profile, 100, 100).unwrap();
        assert_eq!(
            url,
            "https://s.test/citations?user=abc&hl=en&cstart=100&pagesize=100"
        );
    }

    #[test]
    fn test_article_rows_and_more_control() {
        assert_eq!(article_rows(PROFILE).len(), 3);
        assert!(!has_more_articles(PROFILE));
        assert!(has_more_articles(
            r#"<button id="gsc_bpf_more" type="button">Show more</button>"#
        ));
        assert!(!has_more_articles("<p>no control</p>"));
    }

    #[test]
    fn test_parse_author_search_first_result() {
        let html = r#"
            <div class="gs_ai_t">
              <h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user=first">Ada</a></h3>
            </div>
            <div class="gs_ai_t">
              <h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user=second">Ada L.</a></h3>
            </div>
        "#;
        assert_eq!(
            parse_author_search(html, &base()).as_deref(),
            Some("https://scholar.google.com/citations?hl=en&user=first")
        );
        assert_eq!(parse_author_search("<p>No results</p>", &base()), None);
    }

    #[test]
    fn test_parse_full_profile() {
        let profile_url = "https://scholar.google.com/citations?user=abc";
        let record = parse_profile(PROFILE, &base(), "Ada Lovelace", profile_url);

        assert_eq!(record.position.as_deref(), Some("Professor of Mathematics"));
        assert_eq!(record.institution.as_deref(), Some("University of London"));
        assert_eq!(
            record.institution_url.as_deref(),
            Some("https://scholar.google.com/citations?view_op=view_org&org=123")
        );
        assert_eq!(record.personal_website.as_deref(), Some("https://ada.example.org/"));
        assert_eq!(record.research_areas, vec!["Analytical Engines", "Poetical Science"]);
        assert_eq!(record.total_citations, Some(1234));
        assert_eq!(record.h_index, Some(12));
        assert_eq!(record.i10_index, Some(15));
        assert_eq!(record.annual_citations.get("2022"), Some(&30));
        assert_eq!(record.annual_citations.get("2023"), Some(&45));
        assert_eq!(record.public_access_articles, Some(5));

        assert_eq!(record.articles.len(), 2);
        assert_eq!(record.articles[0].title, "Notes on the Analytical Engine");
        assert_eq!(record.articles[0].year.as_deref(), Some("1843"));
        assert_eq!(
            record.articles[0].url.as_deref(),
            Some(concat!(
                "https://scholar.google.com/citations",
                "?view_op=view_citation&citation_for_view=abc:1"
            ))
        );
        assert_eq!(record.articles[1].year, None);
    }

    #[test]
    fn test_histogram_skips_year_without_bar() {
        let html = r#"<div class="gsc_md_hist_b">
            <span class="gsc_g_t">2021</span>
            <span class="gsc_g_t">2022</span>
            <span class="gsc_g_t">2023</span>
            <a href="javascript:void(0)" class="gsc_g_a" style="left:8px;height:5px;z-index:3">
              <span class="gsc_g_al">7</span>
            </a>
            <a href="javascript:void(0)" class="gsc_g_a" style="left:72px;height:20px;z-index:1">
              <span class="gsc_g_al">21</span>
            </a>
        </div>"#;
        let record = parse_profile(html, &base(), "X", "u");
        assert_eq!(record.annual_citations.len(), 2);
        assert_eq!(record.annual_citations.get("2021"), Some(&7));
        assert_eq!(record.annual_citations.get("2022"), None);
        assert_eq!(record.annual_citations.get("2023"), Some(&21));
    }

    #[test]
    fn test_parse_empty_profile_keeps_identity() {
        let record =
            parse_profile("<html><body></body></html>", &base(), "Nobody", "https://x.test/p");
        assert_eq!(record.name, "Nobody");
        assert_eq!(record.profile_url, "https://x.test/p");
        assert!(record.position.is_none());
        assert!(record.research_areas.is_empty());
        assert!(record.annual_citations.is_empty());
        assert_eq!(record.public_access_articles, None);
        assert!(record.articles.is_empty());
    }

    #[test]
    fn test_institution_falls_back_to_link_text() {
        let html = r#"<div class="gsc_prf_il">
            Research Scientist, <a href="/org" class="gsc_prf_ila">Acme Labs</a>
        </div>"#;
        let record = parse_profile(html, &base(), "X", "u");
        assert_eq!(record.position, None);
        assert_eq!(record.institution.as_deref(), Some("Acme Labs"));
    }
}
