use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::{CitedArgs, DetailsArgs, PipelineArgs, ResolveArgs, VerifyArgs};
use crate::commands::{cited, details, resolve, verify};
use crate::common::{expanded_path, format_elapsed, setup_logging, StageStats};

/// Per-stage counters of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub resolve: StageStats,
    pub details: StageStats,
    pub verify: StageStats,
    pub cited: StageStats,
}

/// Checkpoint locations of every stage under the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
struct PipelineContext {
    profiles: PathBuf,
    expanded: PathBuf,
    details: PathBuf,
    verified: PathBuf,
    cited: PathBuf,
}

impl PipelineContext {
    fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        let profiles = output_dir.join("researcher_profiles.csv");
        Ok(Self {
            expanded: expanded_path(&profiles),
            profiles,
            details: output_dir.join("paper_details.csv"),
            verified: output_dir.join("searched_paper_details.csv"),
            cited: output_dir.join("cited_articles.csv"),
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn banner(step: usize, title: &str) {
    info!("");
    info!("=== STEP {}/4: {} ===", step, title);
    info!("");
}

/// Run resolve -> details -> verify -> cited; each stage resumes from its own checkpoint
pub fn run_pipeline(args: PipelineArgs) -> Result<PipelineStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let ctx = PipelineContext::new(Path::new(&args.output_dir))?;

    info!("Starting Scholar citation pipeline");
    info!("Input: {}", args.input);
    info!("Output directory: {}", args.output_dir);

    let rt = tokio::runtime::Runtime::new()?;

    banner(1, "Resolving researchers");
    let resolve_stats = rt
        .block_on(resolve::run_resolve_async(ResolveArgs {
            input: args.input.clone(),
            output: path_arg(&ctx.profiles),
            batch_size: 1,
            fetch: args.fetch.clone(),
            log_level: args.log_level.clone(),
        }))
        .context("Resolve step failed")?;

    banner(2, "Fetching paper details");
    let details_stats = rt
        .block_on(details::run_details_async(DetailsArgs {
            input: path_arg(&ctx.expanded),
            output: path_arg(&ctx.details),
            batch_size: 10,
            fetch: args.fetch.clone(),
            log_level: args.log_level.clone(),
        }))
        .context("Details step failed")?;

    banner(3, "Verifying titles");
    let verify_stats = rt
        .block_on(verify::run_verify_async(VerifyArgs {
            input: path_arg(&ctx.details),
            output: path_arg(&ctx.verified),
            batch_size: 10,
            fetch: args.fetch.clone(),
            log_level: args.log_level.clone(),
        }))
        .context("Verify step failed")?;

    banner(4, "Walking cited-by pages");
    let cited_stats = rt
        .block_on(cited::run_cited_async(CitedArgs {
            input: path_arg(&ctx.verified),
            output: path_arg(&ctx.cited),
            batch_size: 1,
            fetch: args.fetch.clone(),
            log_level: args.log_level.clone(),
        }))
        .context("Cited step failed")?;

    let stats = PipelineStats {
        resolve: resolve_stats,
        details: details_stats,
        verify: verify_stats,
        cited: cited_stats,
    };

    info!("");
    info!("==================== PIPELINE COMPLETE ====================");
    info!("Total execution time: {}", format_elapsed(start_time.elapsed()));
    for (stage, s, output) in [
        ("Resolve", &stats.resolve, &ctx.profiles),
        ("Details", &stats.details, &ctx.details),
        ("Verify", &stats.verify, &ctx.verified),
        ("Cited", &stats.cited, &ctx.cited),
    ] {
        info!(
            "{}: {} written, {} failed, {} already done -> {}",
            stage,
            s.written,
            s.failed,
            s.already_done,
            output.display()
        );
    }
    info!("===========================================================");

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_context_paths_chain_stages() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("run");
        let ctx = PipelineContext::new(&out).unwrap();

        assert!(out.is_dir());
        assert_eq!(ctx.profiles, out.join("researcher_profiles.csv"));
        assert_eq!(ctx.expanded, out.join("researcher_profiles_expand.csv"));
        assert_eq!(ctx.verified, out.join("searched_paper_details.csv"));
    }
}
