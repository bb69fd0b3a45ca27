use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Result-type tags prefixed to listed titles: [CITATION], [PDF], [HTML], [C]
    pub static ref BRACKET_TAG_PATTERN: Regex = Regex::new(r"\[[^\]]*\]").unwrap();
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace typographic quotes and dashes with their ASCII forms
pub fn fold_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

fn strip_enclosing_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn normalize_once(text: &str) -> String {
    let decomposed: String = text.nfkd().collect();
    let folded = fold_punctuation(&decomposed);
    let untagged = BRACKET_TAG_PATTERN.replace_all(&folded, "");
    let collapsed = collapse_whitespace(&untagged);
    strip_enclosing_quotes(&collapsed).trim().to_string()
}

/// Canonical display form of a title.
///
/// Applies NFKD, quote/dash folding, bracket-tag removal, whitespace
/// collapsing and enclosing-quote stripping until the text stops changing,
/// so `normalize_title(normalize_title(x)) == normalize_title(x)`.
pub fn normalize_title(text: &str) -> String {
    let mut current = normalize_once(text);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Key used for case-insensitive title comparison
pub fn match_key(text: &str) -> String {
    normalize_title(text).to_lowercase()
}

/// Whether two titles are the same after normalization, ignoring case
pub fn titles_match(a: &str, b: &str) -> bool {
    match_key(a) == match_key(b)
}
