//! YouTube Data API v3 search backend.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::YouTubeConfig;

use super::{
    playlist_id_from, CandidateStream, SearchError, SearchRequest, VideoCandidate, VideoSearcher,
};

/// The API never returns more than this many items per page.
const MAX_PAGE_SIZE: u32 = 50;

/// Error reasons the API uses for quota and rate limiting.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "dailyLimitExceeded",
    "userRateLimitExceeded",
];

/// YouTube Data API search backend.
pub struct YouTubeApiSearcher {
    client: Client,
    config: Arc<YouTubeConfig>,
}

impl YouTubeApiSearcher {
    /// Create a new searcher with the given configuration.
    pub fn new(config: YouTubeConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SearchError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Build the `search.list` URL for one page.
    fn build_search_url(
        config: &YouTubeConfig,
        request: &SearchRequest,
        page_size: u32,
        page_token: Option<&str>,
    ) -> String {
        let mut url = format!(
            "{}/search?part=snippet&type=video&q={}&maxResults={}&key={}",
            config.base_url.trim_end_matches('/'),
            urlencoding::encode(&request.query),
            page_size,
            urlencoding::encode(&config.api_key),
        );

        if let Some(after) = request.published_after {
            url.push_str("&publishedAfter=");
            url.push_str(&urlencoding::encode(
                &after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        url
    }

    /// Build the `playlistItems.list` URL for one page.
    fn build_playlist_url(
        config: &YouTubeConfig,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> String {
        let mut url = format!(
            "{}/playlistItems?part=snippet&playlistId={}&maxResults={}&key={}",
            config.base_url.trim_end_matches('/'),
            urlencoding::encode(playlist_id),
            MAX_PAGE_SIZE,
            urlencoding::encode(&config.api_key),
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        url
    }

    /// Fetch one page and decode it.
    async fn fetch_page<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, SearchError> {
        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout
            } else if e.is_connect() {
                SearchError::Unavailable(e.to_string())
            } else {
                SearchError::Api(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Api(format!("Failed to parse response: {}", e)))
    }
}

/// Pagination state for one search stream.
struct SearchPager {
    client: Client,
    config: Arc<YouTubeConfig>,
    request: SearchRequest,
    remaining: u32,
    page_token: Option<String>,
    buffer: VecDeque<Result<VideoCandidate, SearchError>>,
    exhausted: bool,
}

impl SearchPager {
    fn new(client: Client, config: Arc<YouTubeConfig>, request: SearchRequest) -> Self {
        Self {
            client,
            config,
            remaining: request.max_results,
            request,
            page_token: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Queue the items of one page, up to the remaining budget, and move to its
    /// next page token. Non-video results do not count against the budget.
    fn ingest_page(&mut self, page: ListResponse) {
        for item in page.items {
            if self.remaining == 0 {
                break;
            }
            match parse_search_item(item) {
                Some(Ok(candidate)) => {
                    self.remaining -= 1;
                    self.buffer.push_back(Ok(candidate));
                }
                Some(Err(e)) => self.buffer.push_back(Err(e)),
                None => {} // channel or playlist result
            }
        }
        self.page_token = page.next_page_token;
        if self.page_token.is_none() {
            self.exhausted = true;
        }
    }

    async fn next_item(&mut self) -> Option<Result<VideoCandidate, SearchError>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            if self.exhausted || self.remaining == 0 {
                return None;
            }

            let url = YouTubeApiSearcher::build_search_url(
                &self.config,
                &self.request,
                self.remaining.min(MAX_PAGE_SIZE),
                self.page_token.as_deref(),
            );
            debug!(query = %self.request.query, remaining = self.remaining, "Fetching search page");

            match YouTubeApiSearcher::fetch_page::<ListResponse>(&self.client, &url).await {
                Ok(page) => self.ingest_page(page),
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[async_trait]
impl VideoSearcher for YouTubeApiSearcher {
    fn name(&self) -> &str {
        "youtube_api"
    }

    fn search(&self, request: &SearchRequest) -> CandidateStream {
        let pager = SearchPager::new(
            self.client.clone(),
            Arc::clone(&self.config),
            request.clone(),
        );

        Box::pin(stream::unfold(pager, |mut pager| async move {
            pager.next_item().await.map(|item| (item, pager))
        }))
    }

    async fn playlist_ids(&self, playlist: &str) -> Result<HashSet<String>, SearchError> {
        let playlist_id = playlist_id_from(playlist);
        let mut ids = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = Self::build_playlist_url(&self.config, playlist_id, page_token.as_deref());
            let page: ListResponse = Self::fetch_page(&self.client, &url).await?;

            for item in page.items {
                match parse_playlist_item(item) {
                    Ok(candidate) => {
                        ids.insert(candidate.video_id);
                    }
                    Err(e) => warn!(playlist = %playlist_id, error = %e, "Skipping playlist item"),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(playlist = %playlist_id, count = ids.len(), "Playlist listing complete");
        Ok(ids)
    }
}

/// Map a non-success response to a search error.
fn classify_error(status: u16, body: &str) -> SearchError {
    let parsed: Option<ApiErrorResponse> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|r| r.error.message.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());

    let quota_reason = parsed.as_ref().is_some_and(|r| {
        r.error
            .errors
            .iter()
            .any(|d| QUOTA_REASONS.contains(&d.reason.as_str()))
    });

    if status == 429 || (status == 403 && quota_reason) {
        SearchError::QuotaExceeded(message)
    } else if status >= 500 {
        SearchError::Unavailable(format!("HTTP {}: {}", status, message))
    } else {
        SearchError::Api(format!("HTTP {}: {}", status, message))
    }
}

/// Parse a `search.list` item. Returns `None` for non-video results.
fn parse_search_item(item: serde_json::Value) -> Option<Result<VideoCandidate, SearchError>> {
    let item: SearchItem = match serde_json::from_value(item) {
        Ok(item) => item,
        Err(e) => return Some(Err(SearchError::MalformedRecord(e.to_string()))),
    };

    if item.id.kind != "youtube#video" {
        return None;
    }

    let video_id = match item.id.video_id {
        Some(id) => id,
        None => {
            return Some(Err(SearchError::MalformedRecord(
                "video result without videoId".to_string(),
            )))
        }
    };

    Some(candidate_from_snippet(video_id, item.snippet))
}

/// Parse a `playlistItems.list` item.
fn parse_playlist_item(item: serde_json::Value) -> Result<VideoCandidate, SearchError> {
    let item: PlaylistItem =
        serde_json::from_value(item).map_err(|e| SearchError::MalformedRecord(e.to_string()))?;

    let video_id = item
        .snippet
        .resource_id
        .as_ref()
        .and_then(|r| r.video_id.clone())
        .ok_or_else(|| SearchError::MalformedRecord("playlist item without videoId".to_string()))?;

    candidate_from_snippet(video_id, item.snippet)
}

fn candidate_from_snippet(video_id: String, snippet: Snippet) -> Result<VideoCandidate, SearchError> {
    let published_at = parse_published_at(&snippet.published_at).ok_or_else(|| {
        SearchError::MalformedRecord(format!(
            "invalid publishedAt '{}' for {}",
            snippet.published_at, video_id
        ))
    })?;

    Ok(VideoCandidate {
        url: format!("https://youtu.be/{}", video_id),
        title: unescape_html(&snippet.title),
        description: snippet
            .description
            .filter(|d| !d.is_empty())
            .map(|d| unescape_html(&d)),
        uploader: unescape_html(&snippet.channel_title),
        published_at,
        video_id,
    })
}

fn parse_published_at(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Search snippets come back HTML-escaped.
fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// YouTube API response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    kind: String,
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    channel_title: String,
    published_at: String,
    #[serde(default)]
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}
