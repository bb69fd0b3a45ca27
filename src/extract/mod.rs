pub mod html;
pub mod normalize;
pub mod paper;
pub mod profile;
pub mod results;

pub use normalize::{collapse_whitespace, match_key, normalize_title, titles_match};
pub use paper::parse_paper_detail;
pub use profile::{
    article_rows, author_search_url, has_more_articles, parse_author_search, parse_profile,
    profile_page_url,
};
pub use results::{
    parse_page_links, parse_results, scholar_search_url, select_match, MatchKind, SearchResult,
};
