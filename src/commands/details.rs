use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

use super::{read_input, StageSettings};
use crate::checkpoint::{resume_filter, BatchWriter, CheckpointLog, CsvRecord, CsvTable};
use crate::cli::DetailsArgs;
use crate::common::{create_count_progress_bar, setup_logging, PaperDetailRecord, StageStats};
use crate::extract::parse_paper_detail;
use crate::fetch::{build_fetcher, Pacing, PageFetcher};

pub const INPUT_TITLE_COLUMN: &str = "Title";
pub const INPUT_URL_COLUMN: &str = "URL";

pub fn default_pacing() -> Pacing {
    Pacing::between(5.0, 8.0)
}

/// An article to look up: its listed title and citation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperLink {
    pub title: String,
    pub url: String,
}

/// Rows carrying both a title and a URL; researchers without articles are skipped
fn load_papers(table: &CsvTable) -> Result<Vec<PaperLink>> {
    table.require_column(INPUT_TITLE_COLUMN)?;
    table.require_column(INPUT_URL_COLUMN)?;

    let mut papers = Vec::new();
    for (idx, row) in table.rows().enumerate() {
        match (row.get(INPUT_TITLE_COLUMN), row.get(INPUT_URL_COLUMN)) {
            (Some(title), Some(url)) => papers.push(PaperLink {
                title: title.to_string(),
                url: url.to_string(),
            }),
            _ => debug!("Skipping input row {}: missing title or URL", idx + 1),
        }
    }
    Ok(papers)
}

/// Fetch the citation page of every paper not yet in the checkpoint
pub async fn fetch_paper_details<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    papers: Vec<PaperLink>,
    checkpoint: &mut CheckpointLog,
    settings: &StageSettings,
) -> Result<StageStats> {
    let mut stats = StageStats {
        input_rows: papers.len(),
        ..StageStats::default()
    };

    let pending = resume_filter(papers, |paper| paper.title.as_str(), checkpoint.processed_keys());
    stats.already_done = stats.input_rows - pending.len();
    info!("{} papers to fetch ({} already done or repeated)", pending.len(), stats.already_done);

    let progress = create_count_progress_bar(pending.len() as u64);
    let mut writer = BatchWriter::new(checkpoint, settings.batch_size);

    for paper in pending {
        stats.attempted += 1;
        progress.set_message(paper.title.clone());

        let page = fetcher.fetch(&paper.url).await;
        settings.pacing.wait().await;

        match page.with_context(|| format!("Failed to load {}", paper.url)) {
            Ok(html) => {
                let record = parse_paper_detail(&html, &paper.title, &paper.url);
                debug!("Details of '{}': {:?}", paper.title, record);
                writer.push(record)?;
            }
            Err(e) => {
                warn!("Error processing {}: {:#}", paper.title, e);
                stats.failed += 1;
            }
        }

        progress.inc(1);
    }

    stats.written = writer.finish()?;
    progress.finish_with_message("Paper details fetched");
    Ok(stats)
}

pub async fn run_details_async(args: DetailsArgs) -> Result<StageStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting paper detail fetcher");
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);
    info!("Batch size: {}", args.batch_size);

    let settings = StageSettings::new(&args.fetch, args.batch_size, default_pacing())?;
    let papers = load_papers(&read_input(&args.input)?)?;
    let mut checkpoint = CheckpointLog::open(
        Path::new(&args.output),
        PaperDetailRecord::HEADER,
        PaperDetailRecord::KEY_COLUMN,
    )?;

    let mut fetcher = build_fetcher(&args.fetch.fetch_config()).await?;
    let result = fetch_paper_details(fetcher.as_mut(), papers, &mut checkpoint, &settings).await;
    if let Err(e) = fetcher.shutdown().await {
        warn!("Failed to close fetcher: {:#}", e);
    }
    let stats = result?;

    stats.log_summary("details", start_time.elapsed(), &args.output);
    Ok(stats)
}

pub fn run_details(args: DetailsArgs) -> Result<StageStats> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_details_async(args))
}
