use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::normalize::collapse_whitespace;

lazy_static! {
    static ref Z_INDEX: Regex = Regex::new(r"z-index:\s*(\d+)").unwrap();
}

/// Parse a selector literal; only used for compile-time constants
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Text nodes trimmed and concatenated without separators
pub fn stripped_text(el: ElementRef<'_>) -> String {
    joined_text(el, "")
}

/// Text nodes trimmed and joined with `sep`, blank nodes dropped
pub fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// All text with whitespace runs collapsed; None when blank
pub fn clean_text(el: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&el.text().collect::<String>().replace('\u{a0}', " "));
    non_empty(text)
}

pub fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// First following sibling element carrying `class`
pub fn next_sibling_with_class<'a>(el: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| has_class(*sibling, class))
}

/// Leading integer of a text such as "12 articles"
pub fn leading_number(text: &str) -> Option<u64> {
    text.split_whitespace()
        .next()
        .and_then(|token| token.replace(',', "").parse().ok())
}

/// Index into `year_count` year labels of a citation-histogram bar.
///
/// Years without citations have no bar, so labels and bars cannot be zipped.
/// A bar's `z-index` counts down from the oldest year to 1 for the newest;
/// bars without a usable one fall back to their position.
pub fn bar_year_index(bar: ElementRef<'_>, position: usize, year_count: usize) -> usize {
    bar.value()
        .attr("style")
        .and_then(|style| Z_INDEX.captures(style))
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|z| (1..=year_count).contains(z))
        .map(|z| year_count - z)
        .unwrap_or(position)
}
