use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use super::html::{
    bar_year_index, joined_text, next_sibling_with_class, non_empty, selector, stripped_text,
};
use crate::common::{parse_count, AnnualCitations, PaperDetailRecord};

lazy_static! {
    static ref FIELD_LABEL: Selector = selector("div.gsc_oci_field");
    static ref DESCRIPTION: Selector = selector("#gsc_oci_descr");
    static ref LINK: Selector = selector("a");
    static ref GRAPH_YEAR: Selector = selector("span.gsc_oci_g_t");
    static ref GRAPH_BAR: Selector = selector("a.gsc_oci_g_a");
    static ref GRAPH_COUNT: Selector = selector("span.gsc_oci_g_al");
}

// Accepted field labels, English first; the page language follows the session
pub const AUTHOR_LABELS: &[&str] = &["Authors", "Autoren", "Inventors"];
pub const PUBLICATION_DATE_LABELS: &[&str] = &["Publication date", "Publikationsdatum"];
pub const VENUE_LABELS: &[&str] = &["Book", "Zeitschrift", "Journal", "Source"];
pub const PAGES_LABELS: &[&str] = &["Pages", "Seiten"];
pub const DESCRIPTION_LABELS: &[&str] = &["Description", "Beschreibung"];
pub const TOTAL_CITATION_LABELS: &[&str] = &["Total citations", "Zitate insgesamt"];
const CITED_BY_VALUE_PREFIXES: &[&str] = &["Cited by ", "Zitiert von: "];

/// Value element of the first field, in document order, whose label is accepted
fn field_value<'a>(document: &'a Html, labels: &[&str]) -> Option<ElementRef<'a>> {
    document
        .select(&FIELD_LABEL)
        .find(|label| labels.contains(&stripped_text(*label).as_str()))
        .and_then(|label| next_sibling_with_class(label, "gsc_oci_value"))
}

fn field_text(document: &Html, labels: &[&str]) -> Option<String> {
    field_value(document, labels).and_then(|value| non_empty(joined_text(value, " ")))
}

fn extract_description(document: &Html) -> Option<String> {
    let value = field_value(document, DESCRIPTION_LABELS)?;
    let description = if value.value().id() == Some("gsc_oci_descr") {
        Some(value)
    } else {
        value.select(&DESCRIPTION).next()
    };
    description.or(Some(value)).and_then(|el| non_empty(joined_text(el, " ")))
}

fn extract_total_citations(document: &Html) -> Option<u64> {
    let value = field_value(document, TOTAL_CITATION_LABELS)?;
    let link = value.select(&LINK).next()?;
    let mut text = stripped_text(link);
    for prefix in CITED_BY_VALUE_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.to_string();
            break;
        }
    }
    parse_count(&text)
}

fn extract_annual_citations(document: &Html) -> AnnualCitations {
    let years: Vec<String> = document.select(&GRAPH_YEAR).map(stripped_text).collect();
    let mut citations = AnnualCitations::new();
    for (position, bar) in document.select(&GRAPH_BAR).enumerate() {
        let year = years.get(bar_year_index(bar, position, years.len()));
        let count = bar
            .select(&GRAPH_COUNT)
            .next()
            .and_then(|count| parse_count(&stripped_text(count)));
        if let (Some(year), Some(count)) = (year, count) {
            citations.insert(year.clone(), count);
        }
    }
    citations
}

/// Extract bibliographic details from an article's citation page
pub fn parse_paper_detail(html: &str, title: &str, url: &str) -> PaperDetailRecord {
    let document = Html::parse_document(html);

    PaperDetailRecord {
        title: title.to_string(),
        url: url.to_string(),
        authors: field_text(&document, AUTHOR_LABELS),
        publication_date: field_text(&document, PUBLICATION_DATE_LABELS),
        venue: field_text(&document, VENUE_LABELS),
        pages: field_text(&document, PAGES_LABELS),
        description: extract_description(&document),
        total_citations: extract_total_citations(&document),
        annual_citations: extract_annual_citations(&document),
    }
}
