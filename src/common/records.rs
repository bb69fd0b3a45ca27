use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::checkpoint::CsvRecord;

/// Citation counts keyed by year, as shown on profile and paper pages
pub type AnnualCitations = BTreeMap<String, u64>;

/// Author display name -> profile URL (None when the name is not linked)
pub type AuthorLinks = BTreeMap<String, Option<String>>;

/// One entry of a researcher's article list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

/// Researcher profile with its nested article list (stage 1)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearcherRecord {
    pub name: String,
    pub profile_url: String,
    pub position: Option<String>,
    pub institution_url: Option<String>,
    pub institution: Option<String>,
    pub personal_website: Option<String>,
    pub research_areas: Vec<String>,
    pub total_citations: Option<u64>,
    pub h_index: Option<u64>,
    pub i10_index: Option<u64>,
    pub annual_citations: AnnualCitations,
    pub public_access_articles: Option<u64>,
    pub articles: Vec<ArticleRef>,
}

impl ResearcherRecord {
    pub const ARTICLES_COLUMN: &'static str = "Articles";

    /// Columns appended to the researcher columns in the expanded file
    pub const ARTICLE_COLUMNS: [&'static str; 3] = ["Title", "Year", "URL"];
}

impl CsvRecord for ResearcherRecord {
    const HEADER: &'static [&'static str] = &[
        "name",
        "researcher_url",
        "position",
        "institution_href",
        "institution",
        "personal_website",
        "research_areas",
        "Total Citations",
        "h-index",
        "i10-index",
        "Annual Citation",
        "total access articles",
        "Articles",
    ];
    const KEY_COLUMN: &'static str = "name";

    fn key(&self) -> &str {
        &self.name
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.profile_url.clone(),
            opt_cell(&self.position),
            opt_cell(&self.institution_url),
            opt_cell(&self.institution),
            opt_cell(&self.personal_website),
            self.research_areas.join(", "),
            count_cell(self.total_citations),
            count_cell(self.h_index),
            count_cell(self.i10_index),
            json_cell(&self.annual_citations),
            count_cell(self.public_access_articles),
            json_cell(&self.articles),
        ]
    }
}

/// Bibliographic details of a single article page (stage 2)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperDetailRecord {
    pub title: String,
    pub url: String,
    pub authors: Option<String>,
    pub publication_date: Option<String>,
    pub venue: Option<String>,
    pub pages: Option<String>,
    pub description: Option<String>,
    pub total_citations: Option<u64>,
    pub annual_citations: AnnualCitations,
}

impl CsvRecord for PaperDetailRecord {
    const HEADER: &'static [&'static str] = &[
        "title",
        "paper url",
        "Authors",
        "Publication date",
        "Book",
        "Pages",
        "Description",
        "Total Citations",
        "Annual Citations",
    ];
    const KEY_COLUMN: &'static str = "title";

    fn key(&self) -> &str {
        &self.title
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.url.clone(),
            opt_cell(&self.authors),
            opt_cell(&self.publication_date),
            opt_cell(&self.venue),
            opt_cell(&self.pages),
            opt_cell(&self.description),
            count_cell(self.total_citations),
            json_cell(&self.annual_citations),
        ]
    }
}

/// Search-verified canonical record for a paper title (stage 3).
///
/// The enrichment fields stay empty when no search result matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifiedPaperRecord {
    pub matched_title: Option<String>,
    pub matched_url: Option<String>,
    pub abstract_text: Option<String>,
    pub cited_by_url: Option<String>,
    pub authors: AuthorLinks,
    pub original_title: String,
    pub original_url: Option<String>,
}

impl VerifiedPaperRecord {
    pub fn unmatched(original_title: &str, original_url: Option<&str>) -> Self {
        Self {
            original_title: original_title.to_string(),
            original_url: original_url.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_title.is_some()
    }
}

impl CsvRecord for VerifiedPaperRecord {
    const HEADER: &'static [&'static str] = &[
        "Matched Title",
        "URL",
        "Abstract",
        "Cited Articles URL",
        "Authors with URLs",
        "Original Title",
        "Original URL",
    ];
    const KEY_COLUMN: &'static str = "Original Title";

    fn key(&self) -> &str {
        &self.original_title
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            opt_cell(&self.matched_title),
            opt_cell(&self.matched_url),
            opt_cell(&self.abstract_text),
            opt_cell(&self.cited_by_url),
            json_cell(&self.authors),
            self.original_title.clone(),
            opt_cell(&self.original_url),
        ]
    }
}

/// One cited-by edge: `title` cites the origin paper (stage 4)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitedArticleRecord {
    pub origin_title: String,
    pub origin_url: Option<String>,
    pub origin_cited_page_url: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub next_cited_by_url: Option<String>,
}

impl CsvRecord for CitedArticleRecord {
    const HEADER: &'static [&'static str] = &[
        "Original Paper Title",
        "Original Paper URL",
        "Original Cited Page URL",
        "Cited Article Title",
        "Cited Article URL",
        "Next Cited Articles URL",
    ];
    const KEY_COLUMN: &'static str = "Original Paper Title";

    fn key(&self) -> &str {
        &self.origin_title
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.origin_title.clone(),
            opt_cell(&self.origin_url),
            self.origin_cited_page_url.clone(),
            opt_cell(&self.title),
            opt_cell(&self.url),
            opt_cell(&self.next_cited_by_url),
        ]
    }
}

fn opt_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn count_cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn json_cell<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_researcher_row_matches_header() {
        let record = ResearcherRecord {
            name: "Ada Lovelace".to_string(),
            profile_url: "https://scholar.google.com/citations?user=abc".to_string(),
            research_areas: vec!["Computing".to_string(), "Mathematics".to_string()],
            total_citations: Some(1200),
            annual_citations: [("2023".to_string(), 40)].into_iter().collect(),
            articles: vec![ArticleRef {
                title: "Notes".to_string(),
                year: Some("1843".to_string()),
                url: None,
            }],
            ..ResearcherRecord::default()
        };

        let row = record.to_row();
        assert_eq!(row.len(), ResearcherRecord::HEADER.len());
        assert_eq!(row[2], "");
        assert_eq!(row[6], "Computing, Mathematics");
        assert_eq!(row[7], "1200");
        assert_eq!(row[10], r#"{"2023":40}"#);
        assert_eq!(row[12], r#"[{"Title":"Notes","Year":"1843","URL":null}]"#);
    }

    #[test]
    fn test_unmatched_verified_record_keeps_provenance() {
        let record = VerifiedPaperRecord::unmatched("A Title", Some("https://example.org/a"));
        assert!(!record.is_matched());

        let row = record.to_row();
        assert_eq!(row.len(), VerifiedPaperRecord::HEADER.len());
        assert_eq!(row[0], "");
        assert_eq!(row[4], "{}");
        assert_eq!(row[5], "A Title");
        assert_eq!(row[6], "https://example.org/a");
        assert_eq!(record.key(), "A Title");
    }

    #[test]
    fn test_cited_article_key_is_origin_title() {
        let record = CitedArticleRecord {
            origin_title: "Seed".to_string(),
            origin_cited_page_url: "https://scholar.google.com/scholar?cites=1".to_string(),
            title: Some("Citing".to_string()),
            ..CitedArticleRecord::default()
        };
        assert_eq!(record.key(), "Seed");
        assert_eq!(record.to_row().len(), CitedArticleRecord::HEADER.len());
    }
}
