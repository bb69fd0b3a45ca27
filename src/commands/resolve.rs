use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use super::{read_input, StageSettings};
use crate::checkpoint::{resume_filter, BatchWriter, CheckpointLog, CsvRecord, CsvTable};
use crate::cli::ResolveArgs;
use crate::common::{
    create_count_progress_bar, expanded_path, setup_logging, ArticleRef, ResearcherRecord,
    StageStats,
};
use crate::extract::{author_search_url, parse_author_search, parse_profile};
use crate::fetch::{build_fetcher, Pacing, PageFetcher};

/// Column holding researcher names in the input file
pub const INPUT_NAME_COLUMN: &str = "name";

/// Settle time after an author search
pub fn default_search_wait() -> Pacing {
    Pacing::fixed(2.0)
}

/// Delay after loading a profile
pub fn default_profile_pacing() -> Pacing {
    Pacing::between(5.0, 8.0)
}

/// Non-blank names of the input file, in order
fn load_names(table: &CsvTable) -> Result<Vec<String>> {
    table.require_column(INPUT_NAME_COLUMN)?;
    Ok(table
        .rows()
        .filter_map(|row| row.get(INPUT_NAME_COLUMN))
        .map(str::to_string)
        .collect())
}

async fn resolve_one<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    name: &str,
    settings: &StageSettings,
    search_wait: &Pacing,
) -> Result<Option<ResearcherRecord>> {
    let search_url = author_search_url(&settings.base_url, name)?;
    let search = fetcher.fetch(&search_url).await;
    search_wait.wait().await;
    let search_html = search.with_context(|| format!("Author search failed for {}", name))?;

    let Some(profile_url) = parse_author_search(&search_html, &settings.base_url) else {
        return Ok(None);
    };
    info!("Found profile for {}: {}", name, profile_url);

    let profile = fetcher.fetch_expanded(&profile_url).await;
    settings.pacing.wait().await;
    let profile_html = profile.with_context(|| format!("Failed to load profile {}", profile_url))?;

    Ok(Some(parse_profile(&profile_html, &settings.base_url, name, &profile_url)))
}

/// Resolve every name not yet in the checkpoint to a researcher profile
pub async fn resolve_researchers<F: PageFetcher + ?Sized>(
    fetcher: &mut F,
    names: Vec<String>,
    checkpoint: &mut CheckpointLog,
    settings: &StageSettings,
    search_wait: &Pacing,
) -> Result<StageStats> {
    let mut stats = StageStats {
        input_rows: names.len(),
        ..StageStats::default()
    };

    let pending = resume_filter(names, |name| name.as_str(), checkpoint.processed_keys());
    stats.already_done = stats.input_rows - pending.len();
    info!(
        "{} researchers to resolve ({} already done or repeated)",
        pending.len(),
        stats.already_done
    );

    let progress = create_count_progress_bar(pending.len() as u64);
    let mut writer = BatchWriter::new(checkpoint, settings.batch_size);

    for name in pending {
        stats.attempted += 1;
        progress.set_message(name.clone());

        match resolve_one(fetcher, &name, settings, search_wait).await {
            Ok(Some(record)) => writer.push(record)?,
            Ok(None) => {
                warn!("No profile found for {}", name);
                stats.failed += 1;
            }
            Err(e) => {
                warn!("Error processing {}: {:#}", name, e);
                stats.failed += 1;
            }
        }

        progress.inc(1);
    }

    stats.written = writer.finish()?;
    progress.finish_with_message("Researchers resolved");
    Ok(stats)
}

/// Rewrite the one-row-per-article companion of a researcher checkpoint.
///
/// Every researcher column except `Articles` is repeated for each article;
/// a researcher without articles keeps a single row with blank article
/// columns. Returns the number of rows written.
pub fn write_expanded(checkpoint: &Path, output: &Path) -> Result<usize> {
    let table = CsvTable::read(checkpoint)
        .with_context(|| format!("Failed to load researcher checkpoint {}", checkpoint.display()))?;
    let articles_idx = table.require_column(ResearcherRecord::ARTICLES_COLUMN)?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = table
        .headers()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != articles_idx)
        .map(|(_, h)| h.as_str())
        .collect();
    header.extend(ResearcherRecord::ARTICLE_COLUMNS);
    writer.write_record(&header)?;

    let width = table.headers().len();
    let mut rows_written = 0;

    for row in table.rows() {
        let researcher: Vec<&str> = (0..width)
            .filter(|idx| *idx != articles_idx)
            .map(|idx| row.cell(idx))
            .collect();

        let articles = match row.get(ResearcherRecord::ARTICLES_COLUMN) {
            Some(cell) => serde_json::from_str::<Vec<ArticleRef>>(cell).unwrap_or_else(|e| {
                warn!("Unreadable article list for {}: {}", row.cell(0), e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        if articles.is_empty() {
            let mut record = researcher.clone();
            record.extend(["", "", ""]);
            writer.write_record(&record)?;
            rows_written += 1;
            continue;
        }

        for article in &articles {
            let mut record: Vec<&str> = researcher.clone();
            record.push(&article.title);
            record.push(article.year.as_deref().unwrap_or(""));
            record.push(article.url.as_deref().unwrap_or(""));
            writer.write_record(&record)?;
            rows_written += 1;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush output file: {}", output.display()))?;
    Ok(rows_written)
}

pub async fn run_resolve_async(args: ResolveArgs) -> Result<StageStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting researcher resolver");
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);
    info!("Fetcher: {:?}", args.fetch.fetcher);

    let settings = StageSettings::new(&args.fetch, args.batch_size, default_profile_pacing())?;
    let search_wait = args.fetch.fixed_wait(default_search_wait());

    let names = load_names(&read_input(&args.input)?)?;
    let output = Path::new(&args.output);
    let mut checkpoint =
        CheckpointLog::open(output, ResearcherRecord::HEADER, ResearcherRecord::KEY_COLUMN)?;

    let mut fetcher = build_fetcher(&args.fetch.fetch_config()).await?;
    let result = resolve_researchers(
        fetcher.as_mut(),
        names,
        &mut checkpoint,
        &settings,
        &search_wait,
    )
    .await;
    if let Err(e) = fetcher.shutdown().await {
        warn!("Failed to close fetcher: {:#}", e);
    }
    let stats = result?;

    let expanded = expanded_path(output);
    let rows = write_expanded(output, &expanded)?;
    info!("Wrote {} article rows to {}", rows, expanded.display());

    stats.log_summary("resolve", start_time.elapsed(), &args.output);
    Ok(stats)
}

pub fn run_resolve(args: ResolveArgs) -> Result<StageStats> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_resolve_async(args))
}
