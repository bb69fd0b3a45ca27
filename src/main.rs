use anyhow::Result;
use clap::Parser;

use scholar_citation_scrape::cli::{Cli, Commands};
use scholar_citation_scrape::commands::{
    run_cited, run_details, run_pipeline, run_reseed, run_resolve, run_verify,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve(args) => {
            run_resolve(args)?;
        }
        Commands::Details(args) => {
            run_details(args)?;
        }
        Commands::Verify(args) => {
            run_verify(args)?;
        }
        Commands::Cited(args) => {
            run_cited(args)?;
        }
        Commands::Pipeline(args) => {
            run_pipeline(args)?;
        }
        Commands::Reseed(args) => {
            run_reseed(args)?;
        }
    }

    Ok(())
}
