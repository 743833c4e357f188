use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ApiKey;
use crate::http::DEFAULT_BASE_URL;
use crate::reviews::DEFAULT_PAGE_SIZE;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Back up reviews, shelves and reading statuses.
    Backup(BackupArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Phase {
    /// Write `goodreads_reviews.json`.
    #[value(alias = "1")]
    Reviews,
    /// Write one `<shelf>.csv` per shelf.
    #[value(alias = "2")]
    Shelves,
    /// Scrape reading statuses into `goodreads_statuses.json`.
    #[value(alias = "3")]
    Statuses,
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Output directory for backup files.
    #[arg(long, default_value = ".")]
    pub output: String,

    /// Goodreads user id (default: GOODREADS_USER_ID).
    #[arg(long)]
    pub user_id: Option<String>,

    /// Goodreads API key (default: GOODREADS_API_KEY).
    #[arg(long)]
    pub api_key: Option<ApiKey>,

    /// Which phases to run, comma-separated.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [Phase::Reviews, Phase::Shelves, Phase::Statuses]
    )]
    pub phase: Vec<Phase>,

    /// Keep reviews with neither a rating nor review text.
    #[arg(long)]
    pub keep_empty: bool,

    /// Omit the header row from shelf CSV files.
    #[arg(long)]
    pub no_header: bool,

    /// Fail instead of overwriting output files left by an earlier run.
    #[arg(long)]
    pub no_clobber: bool,

    /// Reviews requested per API page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: u32,

    /// Stop with an error after this many pages of one collection.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// Per-request timeout.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Service root URL.
    #[arg(long, env = "GOODREADS_BASE_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,
}

impl BackupArgs {
    pub fn runs(&self, phase: Phase) -> bool {
        self.phase.contains(&phase)
    }

    /// Reviews are fetched for both the JSON and the shelf phases.
    pub fn needs_reviews(&self) -> bool {
        self.runs(Phase::Reviews) || self.runs(Phase::Shelves)
    }
}
