use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::cited::{INPUT_CITED_BY_COLUMN, INPUT_TITLE_COLUMN, INPUT_URL_COLUMN};
use super::read_input;
use crate::checkpoint::CsvTable;
use crate::cli::ReseedArgs;
use crate::common::{format_elapsed, next_hop_path, setup_logging};

const CITING_TITLE_COLUMN: &str = "Cited Article Title";
const CITING_URL_COLUMN: &str = "Cited Article URL";
const NEXT_CITED_BY_COLUMN: &str = "Next Cited Articles URL";

/// Columns of a next-hop file, as read by the `cited` stage
pub const NEXT_HOP_HEADER: [&str; 3] =
    [INPUT_TITLE_COLUMN, INPUT_URL_COLUMN, INPUT_CITED_BY_COLUMN];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReseedStats {
    pub input_rows: usize,
    /// Rows lacking a citing title or its own cited-by URL
    pub without_next_url: usize,
    /// Repeated citing titles; the first occurrence is kept
    pub duplicates: usize,
    pub written: usize,
}

/// Turn citing articles into the origins of the next citation hop
pub fn reseed_table(table: &CsvTable, output: &Path) -> Result<ReseedStats> {
    table.require_column(CITING_TITLE_COLUMN)?;
    table.require_column(NEXT_CITED_BY_COLUMN)?;

    let mut stats = ReseedStats {
        input_rows: table.len(),
        ..ReseedStats::default()
    };

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(NEXT_HOP_HEADER)?;

    let mut seen: HashSet<&str> = HashSet::new();
    for row in table.rows() {
        let (Some(title), Some(next_url)) =
            (row.get(CITING_TITLE_COLUMN), row.get(NEXT_CITED_BY_COLUMN))
        else {
            stats.without_next_url += 1;
            continue;
        };
        if !seen.insert(title) {
            debug!("Duplicate citing article '{}'", title);
            stats.duplicates += 1;
            continue;
        }

        let url = row.get(CITING_URL_COLUMN).unwrap_or("");
        writer.write_record([title, url, next_url])?;
        stats.written += 1;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", output.display()))?;
    Ok(stats)
}

pub fn run_reseed(args: ReseedArgs) -> Result<ReseedStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let output: PathBuf = args
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| next_hop_path(&args.input));

    info!("Building next-hop walker input");
    info!("Input: {}", args.input);
    info!("Output: {}", output.display());

    let table = read_input(&args.input)?;
    let stats = reseed_table(&table, &output)?;

    info!("==================== RESEED SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    info!("Input rows: {}", stats.input_rows);
    info!("Without a cited-by URL: {}", stats.without_next_url);
    info!("Duplicate titles: {}", stats.duplicates);
    info!("Origins written: {}", stats.written);
    info!("Output: {}", output.display());
    info!("========================================================");

    Ok(stats)
}
