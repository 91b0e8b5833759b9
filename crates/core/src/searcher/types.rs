//! Types for the video search backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Parameters for a single backend search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text search query.
    pub query: String,
    /// Upper bound on the number of candidates to request.
    pub max_results: u32,
    /// Optional: only ask for videos published at or after this instant.
    /// Backends may ignore this hint; the search stage filters regardless.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_after: Option<DateTime<Utc>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            max_results,
            published_after: None,
        }
    }

    pub fn with_published_after(mut self, after: Option<DateTime<Utc>>) -> Self {
        self.published_after = after;
        self
    }
}

/// A raw video record returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    /// Backend-stable identifier - used for deduplication and exclusion.
    pub video_id: String,
    pub title: String,
    /// Not every backend (or the persisted result log) carries a description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Channel / uploader display name.
    pub uploader: String,
    pub published_at: DateTime<Utc>,
    /// Canonical watch URL.
    pub url: String,
}

impl VideoCandidate {
    /// Publish date formatted for display (`YYYY-MM-DD`).
    pub fn published_date(&self) -> String {
        self.published_at.format("%Y-%m-%d").to_string()
    }
}

/// Errors that can occur during search operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Search backend API error: {0}")]
    Api(String),

    #[error("Request timeout")]
    Timeout,
}

impl SearchError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, SearchError::QuotaExceeded(_))
    }

    /// Whether the error only affects a single record and the stream may continue.
    pub fn is_record_level(&self) -> bool {
        matches!(self, SearchError::MalformedRecord(_))
    }
}

/// Lazy sequence of candidates for one search.
///
/// The stream owns everything it needs, so each worker can drive its own
/// stream without sharing per-search state.
pub type CandidateStream = BoxStream<'static, Result<VideoCandidate, SearchError>>;

/// Trait for video search backends.
#[async_trait]
pub trait VideoSearcher: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Start a search. Nothing is requested until the stream is polled.
    fn search(&self, request: &SearchRequest) -> CandidateStream;

    /// List the video ids in a playlist (given as an id or a URL).
    async fn playlist_ids(&self, playlist: &str) -> Result<HashSet<String>, SearchError>;
}

/// Extract a playlist id from a bare id or a URL carrying a `list=` parameter.
pub fn playlist_id_from(input: &str) -> &str {
    let input = input.trim();
    match input.find("list=") {
        Some(pos) => {
            let rest = &input[pos + "list=".len()..];
            rest.split(['&', '#']).next().unwrap_or(rest)
        }
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_search_request_serialization() {
        let request = SearchRequest::new("test query", 25)
            .with_published_after(Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));

        let json = serde_json::to_string(&request).unwrap();
        let parsed: SearchRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.query, "test query");
        assert_eq!(parsed.max_results, 25);
        assert!(parsed.published_after.is_some());
    }

    #[test]
    fn test_search_request_minimal() {
        let json = r#"{"query": "minimal", "max_results": 5}"#;
        let parsed: SearchRequest = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.query, "minimal");
        assert!(parsed.published_after.is_none());
    }

    #[test]
    fn test_published_date_format() {
        let candidate = VideoCandidate {
            video_id: "abc".to_string(),
            title: "Title".to_string(),
            description: None,
            uploader: "Someone".to_string(),
            published_at: Utc.with_ymd_and_hms(2023, 7, 4, 18, 30, 0).unwrap(),
            url: "https://youtu.be/abc".to_string(),
        };
        assert_eq!(candidate.published_date(), "2023-07-04");
    }

    #[test]
    fn test_error_classification() {
        assert!(SearchError::QuotaExceeded("daily".into()).is_quota_exceeded());
        assert!(!SearchError::Timeout.is_quota_exceeded());
        assert!(SearchError::MalformedRecord("x".into()).is_record_level());
        assert!(!SearchError::Api("x".into()).is_record_level());
    }

    #[test]
    fn test_error_display() {
        let err = SearchError::Unavailable("yt-dlp not found".to_string());
        assert_eq!(err.to_string(), "Search backend unavailable: yt-dlp not found");
    }

    #[test]
    fn test_playlist_id_from_url() {
        assert_eq!(
            playlist_id_from("https://www.youtube.com/playlist?list=PL123abc"),
            "PL123abc"
        );
        assert_eq!(
            playlist_id_from("https://www.youtube.com/watch?v=xyz&list=PLfoo&index=2"),
            "PLfoo"
        );
        assert_eq!(playlist_id_from("  PLbare  "), "PLbare");
    }
}
