//! Video search abstraction.
//!
//! This module provides a `VideoSearcher` trait for searching videos through
//! interchangeable backends: the YouTube Data API and the yt-dlp CLI.

mod types;
mod youtube;
mod ytdlp;

pub use types::*;
pub use youtube::YouTubeApiSearcher;
pub use ytdlp::YtDlpSearcher;

use std::sync::Arc;

use crate::config::{Config, SearcherBackend};

/// Create the searcher selected by `config.search.backend`.
pub fn create_searcher(config: &Config) -> Result<Arc<dyn VideoSearcher>, SearchError> {
    match config.search.backend {
        SearcherBackend::YoutubeApi => {
            let youtube = config.youtube.clone().ok_or_else(|| {
                SearchError::Unavailable("the youtube_api backend needs a [youtube] section".into())
            })?;
            Ok(Arc::new(YouTubeApiSearcher::new(youtube)?))
        }
        SearcherBackend::YtDlp => Ok(Arc::new(YtDlpSearcher::new(config.yt_dlp.clone()))),
    }
}
