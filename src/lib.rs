//! Resumable scraping of researcher profiles, paper details and cited-by
//! graphs from Google Scholar into CSV checkpoint files.

pub mod checkpoint;
pub mod cli;
pub mod commands;
pub mod common;
pub mod extract;
pub mod fetch;
pub mod graph;
