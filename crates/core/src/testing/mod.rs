//! Testing utilities and mock implementations.
//!
//! Provides a scripted [`MockSearcher`] and an in-memory [`MemoryResultStore`]
//! so search runs can be exercised without a network or a filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use secretfills_core::testing::{fixtures, MemoryResultStore, MockSearcher};
//!
//! let searcher = MockSearcher::new()
//!     .with_results("foo bar", vec![fixtures::candidate("a1", "foo bar live", "X")]);
//! let store = MemoryResultStore::new();
//!
//! // Run an Aggregator over them...
//! ```

mod mock_searcher;
mod mock_store;

pub use mock_searcher::{MockSearcher, RecordedSearch, ScriptedItem};
pub use mock_store::MemoryResultStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::searcher::VideoCandidate;
    use crate::stage::ScoredResult;

    /// Publish time used when a fixture doesn't specify one.
    pub fn default_published_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Create a test candidate with reasonable defaults.
    pub fn candidate(video_id: &str, title: &str, uploader: &str) -> VideoCandidate {
        candidate_at(video_id, title, uploader, default_published_at())
    }

    /// Create a test candidate published at `published_at`.
    pub fn candidate_at(
        video_id: &str,
        title: &str,
        uploader: &str,
        published_at: DateTime<Utc>,
    ) -> VideoCandidate {
        VideoCandidate {
            video_id: video_id.to_string(),
            title: title.to_string(),
            description: None,
            uploader: uploader.to_string(),
            published_at,
            url: format!("https://youtu.be/{}", video_id),
        }
    }

    /// Create a scored result with an explicit score.
    pub fn scored(video_id: &str, title: &str, query: &str, score: u8) -> ScoredResult {
        ScoredResult {
            video: candidate(video_id, title, "uploader"),
            query: query.to_string(),
            score,
        }
    }

    /// Create a scored result published on `date` (`YYYY-MM-DD`).
    pub fn scored_at(video_id: &str, score: u8, date: &str) -> ScoredResult {
        let published_at = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|d| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN)))
            .unwrap_or_else(|_| default_published_at());

        ScoredResult {
            video: candidate_at(video_id, "title", "uploader", published_at),
            query: "query".to_string(),
            score,
        }
    }
}
