use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

use super::{read_input, StageSettings};
use crate::checkpoint::{resume_filter, BatchWriter, CheckpointLog, CsvRecord, CsvTable};
use crate::cli::VerifyArgs;
use crate::common::{create_count_progress_bar, setup_logging, StageStats, VerifiedPaperRecord};
use crate::extract::{parse_results, scholar_search_url, select_match, MatchKind};
use crate::fetch::{build_fetcher, Pacing, PageFetcher};

pub const INPUT_TITLE_COLUMN: &str = "title";
pub const INPUT_URL_COLUMN: &str = "paper url";

pub fn default_pacing() -> Pacing {
    Pacing::between(5.0, 7.0)
}

/// A paper title to re-search, with the URL it was found under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleQuery {
    pub title: String,
    pub url: Option<String>,
}

fn load_queries(table: &CsvTable) -> Result<Vec<TitleQuery>> {
    table.require_column(INPUT_TITLE_COLUMN)?;

    Ok(table
        .rows()
        .filter_map(|row| {
            Some(TitleQuery {
                title: row.get(INPUT_TITLE_COLUMN)?.to_string(),
                url: row.get(INPUT_URL_COLUMN).map(str::to_string),
            })
        })
        .collect())
}

async fn verify_one<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    query: &TitleQuery,
    settings: &StageSettings,
) -> Result<VerifiedPaperRecord> {
    let search_url = scholar_search_url(&settings.base_url, &query.title)?;
    let page = fetcher.fetch(&search_url).await;
    settings.pacing.wait().await;
    let html = page.with_context(|| format!("Search failed for '{}'", query.title))?;

    let results = parse_results(&html, &settings.base_url);
    debug!("{} search results for '{}'", results.len(), query.title);

    let Some((result, kind)) = select_match(&query.title, &results) else {
        info!("No exact match found for '{}'", query.title);
        return Ok(VerifiedPaperRecord::unmatched(&query.title, query.url.as_deref()));
    };

    match kind {
        MatchKind::Exact => info!("Exact match found for '{}'", query.title),
        MatchKind::SoleResult => info!(
            "Accepted the only search result for '{}': '{}'",
            query.title,
            result.title.as_deref().unwrap_or_default()
        ),
    }

    Ok(VerifiedPaperRecord {
        matched_title: result.title.clone(),
        matched_url: result.link.clone(),
        abstract_text: result.abstract_text.clone(),
        cited_by_url: result.cited_by_url.clone(),
        authors: result.authors.clone(),
        original_title: query.title.clone(),
        original_url: query.url.clone(),
    })
}

/// Search every title not yet in the checkpoint and keep the matching result.
///
/// A title without a match is still recorded, with empty enrichment fields,
/// so it is not searched again. A failed search is retried on the next run.
pub async fn verify_titles<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    queries: Vec<TitleQuery>,
    checkpoint: &mut CheckpointLog,
    settings: &StageSettings,
) -> Result<StageStats> {
    let mut stats = StageStats {
        input_rows: queries.len(),
        ..StageStats::default()
    };

    let pending = resume_filter(queries, |query| query.title.as_str(), checkpoint.processed_keys());
    stats.already_done = stats.input_rows - pending.len();
    info!("{} titles to verify ({} already done or repeated)", pending.len(), stats.already_done);

    let progress = create_count_progress_bar(pending.len() as u64);
    let mut writer = BatchWriter::new(checkpoint, settings.batch_size);
    let mut unmatched = 0;

    for query in pending {
        stats.attempted += 1;
        progress.set_message(query.title.clone());

        match verify_one(fetcher, &query, settings).await {
            Ok(record) => {
                if !record.is_matched() {
                    unmatched += 1;
                }
                writer.push(record)?;
            }
            Err(e) => {
                warn!("Error processing '{}': {:#}", query.title, e);
                stats.failed += 1;
            }
        }

        progress.inc(1);
    }

    stats.written = writer.finish()?;
    progress.finish_with_message("Titles verified");
    info!("Titles without a matching result: {}", unmatched);
    Ok(stats)
}

pub async fn run_verify_async(args: VerifyArgs) -> Result<StageStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting title verifier");
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);
    info!("Batch size: {}", args.batch_size);

    let settings = StageSettings::new(&args.fetch, args.batch_size, default_pacing())?;
    let queries = load_queries(&read_input(&args.input)?)?;
    let mut checkpoint = CheckpointLog::open(
        Path::new(&args.output),
        VerifiedPaperRecord::HEADER,
        VerifiedPaperRecord::KEY_COLUMN,
    )?;

    let mut fetcher = build_fetcher(&args.fetch.fetch_config()).await?;
    let result = verify_titles(fetcher.as_mut(), queries, &mut checkpoint, &settings).await;
    if let Err(e) = fetcher.shutdown().await {
        warn!("Failed to close fetcher: {:#}", e);
    }
    let stats = result?;

    stats.log_summary("verify", start_time.elapsed(), &args.output);
    Ok(stats)
}

pub fn run_verify(args: VerifyArgs) -> Result<StageStats> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_verify_async(args))
}
