use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

use super::{read_input, StageSettings};
use crate::checkpoint::{resume_filter, BatchWriter, CheckpointLog, CsvRecord, CsvTable};
use crate::cli::CitedArgs;
use crate::common::{create_count_progress_bar, setup_logging, CitedArticleRecord, StageStats};
use crate::fetch::{build_fetcher, Pacing, PageFetcher};
use crate::graph::{walk_cited_by, OriginPaper};

pub const INPUT_TITLE_COLUMN: &str = "Original Title";
pub const INPUT_URL_COLUMN: &str = "URL";
pub const INPUT_CITED_BY_COLUMN: &str = "Cited Articles URL";

pub fn default_pacing() -> Pacing {
    Pacing::between(2.0, 5.0)
}

/// Papers with a cited-by page; rows without one have nothing to walk
fn load_origins(table: &CsvTable) -> Result<Vec<OriginPaper>> {
    table.require_column(INPUT_TITLE_COLUMN)?;
    table.require_column(INPUT_CITED_BY_COLUMN)?;

    let mut origins = Vec::new();
    for row in table.rows() {
        let Some(title) = row.get(INPUT_TITLE_COLUMN) else {
            continue;
        };
        let Some(cited_by_url) = row.get(INPUT_CITED_BY_COLUMN) else {
            debug!("No cited-by URL for '{}'", title);
            continue;
        };
        origins.push(OriginPaper {
            title: title.to_string(),
            url: row.get(INPUT_URL_COLUMN).map(str::to_string),
            cited_by_url: cited_by_url.to_string(),
        });
    }
    Ok(origins)
}

/// Walk the cited-by pages of every paper not yet in the checkpoint.
///
/// All citing records of a paper are appended together. A paper whose walk
/// yields no records leaves no trace in the checkpoint and is walked again on
/// the next run.
pub async fn collect_citations<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    origins: Vec<OriginPaper>,
    checkpoint: &mut CheckpointLog,
    settings: &StageSettings,
) -> Result<StageStats> {
    let mut stats = StageStats {
        input_rows: origins.len(),
        ..StageStats::default()
    };

    let pending = resume_filter(
        origins,
        |origin| origin.title.as_str(),
        checkpoint.processed_keys(),
    );
    stats.already_done = stats.input_rows - pending.len();
    info!("{} papers to walk ({} already done or repeated)", pending.len(), stats.already_done);

    let progress = create_count_progress_bar(pending.len() as u64);
    let mut writer: BatchWriter<CitedArticleRecord> =
        BatchWriter::new(checkpoint, settings.batch_size);

    for origin in pending {
        stats.attempted += 1;
        progress.set_message(origin.title.clone());
        info!("Processing paper: {}", origin.title);

        match walk_cited_by(fetcher, &origin, &settings.base_url, &settings.pacing).await {
            Ok(report) => {
                info!(
                    "Found {} citing articles for '{}' on {} pages ({} failed)",
                    report.records.len(),
                    origin.title,
                    report.pages_visited,
                    report.pages_failed
                );
                if report.records.is_empty() {
                    warn!("No citing articles recorded for '{}'", origin.title);
                }
                writer.push_all(report.records)?;
            }
            Err(e) => {
                warn!("Error processing '{}': {:#}", origin.title, e);
                stats.failed += 1;
            }
        }

        progress.inc(1);
    }

    stats.written = writer.finish()?;
    progress.finish_with_message("Cited-by pages walked");
    Ok(stats)
}

pub async fn run_cited_async(args: CitedArgs) -> Result<StageStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting cited-by walker");
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);

    let settings = StageSettings::new(&args.fetch, args.batch_size, default_pacing())?;
    let origins = load_origins(&read_input(&args.input)?)?;
    let mut checkpoint = CheckpointLog::open(
        Path::new(&args.output),
        CitedArticleRecord::HEADER,
        CitedArticleRecord::KEY_COLUMN,
    )?;

    let mut fetcher = build_fetcher(&args.fetch.fetch_config()).await?;
    let result = collect_citations(fetcher.as_mut(), origins, &mut checkpoint, &settings).await;
    if let Err(e) = fetcher.shutdown().await {
        warn!("Failed to close fetcher: {:#}", e);
    }
    let stats = result?;

    stats.log_summary("cited", start_time.elapsed(), &args.output);
    Ok(stats)
}

pub fn run_cited(args: CitedArgs) -> Result<StageStats> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_cited_async(args))
}
