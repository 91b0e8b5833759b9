//! Command line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use secretfills_core::SearcherBackend;

/// Default config file, used only if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "secret-fills.toml";

#[derive(Parser, Debug)]
#[command(name = "secret-fills")]
#[command(about = "Search video backends for unlisted uploads of known titles")]
#[command(version)]
pub struct Cli {
    /// Config file (default: secret-fills.toml if present)
    #[arg(short, long, global = true, env = "SECRET_FILLS_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for every query and print the ranked results
    Search(SearchArgs),

    /// Print the ranked contents of an earlier result log
    Review(ReviewArgs),

    /// Save the video ids of a playlist to a file
    KnownIds(KnownIdsArgs),

    /// Mark video ids as false positives so later searches skip them
    Exclude(ExcludeArgs),

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Results requested per query
    #[arg(short = 'n', long)]
    pub max_results: Option<u32>,

    /// Strings to search for
    #[arg(short = 's', long, num_args = 1..)]
    pub search_terms: Vec<String>,

    /// File of queries: a Date,Title CSV table or one title per line
    #[arg(short = 'f', long)]
    pub queries_file: Option<PathBuf>,

    /// Uploaders whose videos are ignored
    #[arg(short = 'i', long, num_args = 1..)]
    pub ignored_uploaders: Vec<String>,

    /// File of video ids to ignore, one per line
    #[arg(short = 'x', long)]
    pub exclude_ids: Option<PathBuf>,

    /// Additional id files to ignore, e.g. a saved playlist
    #[arg(long)]
    pub known_ids: Vec<PathBuf>,

    /// Playlist (id or URL) whose videos are ignored
    #[arg(long)]
    pub playlist: Option<String>,

    /// Minimum similarity for a result to be printed
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_similarity: Option<u8>,

    /// Ignore videos published before this date (YYYY-MM-DD) unless a query has its own
    #[arg(long)]
    pub after: Option<NaiveDate>,

    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Queries searched at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Stop searching after this many seconds and keep what was found
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Result log to write
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Append to the result log instead of replacing it
    #[arg(long)]
    pub append: bool,

    /// Print the best matches first
    #[arg(long)]
    pub descending: bool,

    /// No spinner or live results; only the final listing
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Result log to read
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Minimum similarity for a result to be printed
    #[arg(short = 'm', long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_similarity: Option<u8>,

    /// Print the best matches first
    #[arg(long)]
    pub descending: bool,
}

#[derive(Args, Debug)]
pub struct KnownIdsArgs {
    /// Playlist id or URL
    pub playlist: String,

    /// Where to save the ids
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

#[derive(Args, Debug)]
pub struct ExcludeArgs {
    /// Video ids to exclude
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Exclusion list to append to
    #[arg(short = 'x', long)]
    pub exclude_ids: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    YoutubeApi,
    YtDlp,
}

impl From<BackendArg> for SearcherBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::YoutubeApi => SearcherBackend::YoutubeApi,
            BackendArg::YtDlp => SearcherBackend::YtDlp,
        }
    }
}
