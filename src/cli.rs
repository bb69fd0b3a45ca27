use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::fetch::pacing::MAX_DELAY_SECS;
use crate::fetch::{ExpandPolicy, FetchConfig, FetcherKind, Pacing, DEFAULT_BASE_URL};

#[derive(Parser)]
#[command(name = "scholar-citation-scrape")]
#[command(about = "Resumable scraper for Google Scholar profiles, paper details and citations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage 1: resolve researcher names to profiles and article lists
    Resolve(ResolveArgs),

    /// Stage 2: fetch bibliographic details for every profile article
    Details(DetailsArgs),

    /// Stage 3: re-search paper titles and keep the exactly matching result
    Verify(VerifyArgs),

    /// Stage 4: list the articles citing each verified paper
    Cited(CitedArgs),

    /// Run stages 1-4 in order, each resuming from its own checkpoint
    Pipeline(PipelineArgs),

    /// Turn a cited-articles file into stage 4 input for the next citation hop
    Reseed(ReseedArgs),
}

/// Options shared by every stage that loads pages
#[derive(Args, Clone, Debug)]
pub struct FetchArgs {
    /// Page fetcher: plain HTTP, or headless Chrome for pages with "Show more" lists
    #[arg(long, value_enum, default_value = "http")]
    pub fetcher: FetcherKind,

    /// Site origin used for searches and to resolve relative links
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout in seconds per page load
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Lower bound of the random delay after each page load, in seconds
    #[arg(long, value_parser = parse_delay)]
    pub min_delay: Option<f64>,

    /// Upper bound of the random delay after each page load, in seconds
    #[arg(long, value_parser = parse_delay)]
    pub max_delay: Option<f64>,

    /// Disable all delays between page loads
    #[arg(long, default_value = "false")]
    pub no_delay: bool,

    /// Show the browser window (browser fetcher only)
    #[arg(long, default_value = "false")]
    pub show_browser: bool,
}

/// A delay in seconds between 0 and `MAX_DELAY_SECS`
fn parse_delay(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number of seconds", value))?;
    if secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("delay must be between 0 and {} seconds", MAX_DELAY_SECS))
    }
}

impl FetchArgs {
    /// Delay after each page load: the stage default unless overridden
    pub fn pacing(&self, default: Pacing) -> Pacing {
        if self.no_delay {
            return Pacing::none();
        }
        match (self.min_delay, self.max_delay) {
            (None, None) => default,
            (Some(min), None) => Pacing::between(min, default.max_secs().max(min)),
            (None, Some(max)) => Pacing::between(default.min_secs().min(max), max),
            (Some(min), Some(max)) => Pacing::between(min, max),
        }
    }

    /// Fixed waits (search settle time, "Show more" rendering) that only `--no-delay` removes
    pub fn fixed_wait(&self, default: Pacing) -> Pacing {
        if self.no_delay {
            Pacing::none()
        } else {
            default
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = ExpandPolicy::default();
        FetchConfig {
            kind: self.fetcher,
            timeout: Duration::from_secs(self.timeout),
            show_browser: self.show_browser,
            expand: ExpandPolicy {
                after_click: self.fixed_wait(defaults.after_click),
                after_intercept: self.fixed_wait(defaults.after_intercept),
                ..defaults
            },
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ResolveArgs {
    /// CSV file with a `name` column
    #[arg(short, long, default_value = "researchers_input.csv")]
    pub input: String,

    /// Researcher profile checkpoint; `<stem>_expand.csv` is written next to it
    #[arg(short, long, default_value = "researcher_profiles.csv")]
    pub output: String,

    /// Profiles appended per checkpoint flush
    #[arg(long, default_value = "1")]
    pub batch_size: usize,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone, Debug)]
pub struct DetailsArgs {
    /// Expanded researcher CSV with `Title` and `URL` columns
    #[arg(short, long, default_value = "researcher_profiles_expand.csv")]
    pub input: String,

    /// Paper details checkpoint
    #[arg(short, long, default_value = "paper_details.csv")]
    pub output: String,

    /// Papers appended per checkpoint flush
    #[arg(long, default_value = "10")]
    pub batch_size: usize,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone, Debug)]
pub struct VerifyArgs {
    /// Paper details CSV with `title` and `paper url` columns
    #[arg(short, long, default_value = "paper_details.csv")]
    pub input: String,

    /// Verified papers checkpoint
    #[arg(short, long, default_value = "searched_paper_details.csv")]
    pub output: String,

    /// Papers appended per checkpoint flush
    #[arg(long, default_value = "10")]
    pub batch_size: usize,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone, Debug)]
pub struct CitedArgs {
    /// Verified papers CSV with `Original Title`, `URL` and `Cited Articles URL` columns
    #[arg(short, long, default_value = "searched_paper_details.csv")]
    pub input: String,

    /// Cited articles checkpoint
    #[arg(short, long, default_value = "cited_articles.csv")]
    pub output: String,

    /// Citing-article rows appended per checkpoint flush (a paper's rows are never split)
    #[arg(long, default_value = "1")]
    pub batch_size: usize,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone, Debug)]
pub struct PipelineArgs {
    /// CSV file with a `name` column
    #[arg(short, long, required = true)]
    pub input: String,

    /// Directory receiving every stage's checkpoint
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone, Debug)]
pub struct ReseedArgs {
    /// Cited articles CSV produced by the `cited` stage
    #[arg(short, long, default_value = "cited_articles.csv")]
    pub input: String,

    /// Stage 4 input for the next hop (default: `<input stem>_next_hop.csv`)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}
