pub mod cited;
pub mod details;
pub mod pipeline;
pub mod reseed;
pub mod resolve;
pub mod verify;

pub use cited::run_cited;
pub use details::run_details;
pub use pipeline::run_pipeline;
pub use reseed::run_reseed;
pub use resolve::run_resolve;
pub use verify::run_verify;

use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

use crate::checkpoint::CsvTable;
use crate::cli::FetchArgs;
use crate::fetch::Pacing;

/// Settings every scraping stage loop needs
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub base_url: Url,
    pub batch_size: usize,
    /// Delay after each page load
    pub pacing: Pacing,
}

impl StageSettings {
    pub fn new(fetch: &FetchArgs, batch_size: usize, default_pacing: Pacing) -> Result<Self> {
        let base_url = Url::parse(&fetch.base_url)
            .with_context(|| format!("Invalid base URL: {}", fetch.base_url))?;
        Ok(Self {
            base_url,
            batch_size,
            pacing: fetch.pacing(default_pacing),
        })
    }

    /// Scholar origin, no batching beyond single rows, no delays
    #[cfg(test)]
    pub fn immediate(batch_size: usize) -> Self {
        Self {
            base_url: Url::parse(crate::fetch::DEFAULT_BASE_URL).unwrap(),
            batch_size,
            pacing: Pacing::none(),
        }
    }
}

fn read_input(path: &str) -> Result<CsvTable> {
    CsvTable::read(Path::new(path)).with_context(|| format!("Failed to read input file: {}", path))
}
