pub mod walker;

pub use walker::{walk_cited_by, OriginPaper, WalkReport};
