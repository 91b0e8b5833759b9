use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    #[serde(default)]
    pub yt_dlp: YtDlpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Available search backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearcherBackend {
    /// YouTube Data API v3 (requires an API key, consumes quota)
    YoutubeApi,
    /// Local yt-dlp binary
    #[default]
    YtDlp,
}

impl SearcherBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearcherBackend::YoutubeApi => "youtube_api",
            SearcherBackend::YtDlp => "yt_dlp",
        }
    }
}

/// Search run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearcherBackend,
    /// Results requested per query (default: 25)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Queries searched at the same time (default: 8)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Minimum similarity for a result to be displayed (default: 0)
    #[serde(default)]
    pub min_score: u8,
    /// Overall deadline for a search run in seconds (default: none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
    /// Uploaders whose videos never appear in results
    #[serde(default)]
    pub ignored_uploaders: Vec<String>,
    /// Buffer between search workers and the merge loop (default: 256)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearcherBackend::default(),
            max_results: default_max_results(),
            concurrency: default_concurrency(),
            min_score: 0,
            deadline_secs: None,
            ignored_uploaders: Vec::new(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_max_results() -> u32 {
    25
}

fn default_concurrency() -> usize {
    8
}

fn default_channel_capacity() -> usize {
    256
}

/// YouTube Data API backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YouTubeConfig {
    /// API key with access to the YouTube Data API v3
    pub api_key: String,
    /// API root (default: "https://www.googleapis.com/youtube/v3")
    #[serde(default = "default_youtube_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_youtube_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// yt-dlp backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YtDlpConfig {
    /// Path to the yt-dlp binary (default: "yt-dlp", looked up on PATH)
    #[serde(default = "default_ytdlp_binary")]
    pub binary: PathBuf,
    /// Maximum wait for the next output line in seconds (default: 120)
    #[serde(default = "default_ytdlp_timeout")]
    pub timeout_secs: u64,
    /// Extra arguments passed before the search target
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: default_ytdlp_binary(),
            timeout_secs: default_ytdlp_timeout(),
            extra_args: Vec::new(),
        }
    }
}

fn default_ytdlp_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ytdlp_timeout() -> u64 {
    120
}

/// File locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Result log written during a search (default: "results.txt")
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    /// Ids that never appear in results (default: "exclude_ids.txt")
    #[serde(default = "default_exclude_ids_path")]
    pub exclude_ids_path: PathBuf,
    /// Cached playlist ids (default: "known_ids.txt")
    #[serde(default = "default_known_ids_path")]
    pub known_ids_path: PathBuf,
    /// Keep earlier runs in the result log instead of truncating it
    #[serde(default)]
    pub append_results: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
            exclude_ids_path: default_exclude_ids_path(),
            known_ids_path: default_known_ids_path(),
            append_results: false,
        }
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.txt")
}

fn default_exclude_ids_path() -> PathBuf {
    PathBuf::from("exclude_ids.txt")
}

fn default_known_ids_path() -> PathBuf {
    PathBuf::from("known_ids.txt")
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub search: SearchConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<SanitizedYouTubeConfig>,
    pub yt_dlp: YtDlpConfig,
    pub storage: StorageConfig,
}

/// Sanitized YouTube config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedYouTubeConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            search: config.search.clone(),
            youtube: config.youtube.as_ref().map(|y| SanitizedYouTubeConfig {
                base_url: y.base_url.clone(),
                api_key_configured: !y.api_key.is_empty(),
                timeout_secs: y.timeout_secs,
            }),
            yt_dlp: config.yt_dlp.clone(),
            storage: config.storage.clone(),
        }
    }
}
