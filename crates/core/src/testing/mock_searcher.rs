//! Mock searcher for testing.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::searcher::{
    CandidateStream, SearchError, SearchRequest, VideoCandidate, VideoSearcher,
};

/// A recorded search for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    /// The request that was made.
    pub request: SearchRequest,
    /// When the stream was first polled.
    pub timestamp: Instant,
}

/// One step of a scripted search.
#[derive(Debug, Clone)]
pub enum ScriptedItem {
    Candidate(VideoCandidate),
    Error(SearchError),
    /// Wait before producing the next item.
    Pause(Duration),
}

/// Mock implementation of the VideoSearcher trait.
///
/// Each query string maps to a script that its stream plays back in order.
/// Unscripted queries return no candidates. Items are yielded as written,
/// without truncating to `max_results`.
///
/// # Example
///
/// ```rust,ignore
/// use secretfills_core::testing::{fixtures, MockSearcher};
///
/// let searcher = MockSearcher::new()
///     .with_results("foo bar", vec![fixtures::candidate("a1", "foo bar live", "X")])
///     .with_quota_after("other", vec![fixtures::candidate("b1", "other", "Y")]);
/// ```
pub struct MockSearcher {
    scripts: Arc<RwLock<HashMap<String, Vec<ScriptedItem>>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    playlists: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    /// Applied before every scripted item.
    item_delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
}

/// Counts one open search stream until dropped.
struct ActiveSearch(Arc<AtomicUsize>);

impl Drop for ActiveSearch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSearcher")
            .field("scripts", &"<scripts>")
            .field("searches", &"<searches>")
            .field("playlists", &"<playlists>")
            .field("item_delay", &self.item_delay)
            .finish()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            playlists: Arc::new(RwLock::new(HashMap::new())),
            item_delay: None,
            active: Arc::new(AtomicUsize::new(0)),
            peak_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script `query` to play back `items`.
    pub fn with_script(self, query: &str, items: Vec<ScriptedItem>) -> Self {
        if let Ok(mut scripts) = self.scripts.try_write() {
            scripts.insert(query.to_string(), items);
        }
        self
    }

    /// Script `query` to yield `results` and end normally.
    pub fn with_results(self, query: &str, results: Vec<VideoCandidate>) -> Self {
        let items = results.into_iter().map(ScriptedItem::Candidate).collect();
        self.with_script(query, items)
    }

    /// Script `query` to yield `results` and then report an exhausted quota.
    pub fn with_quota_after(self, query: &str, results: Vec<VideoCandidate>) -> Self {
        let mut items: Vec<ScriptedItem> =
            results.into_iter().map(ScriptedItem::Candidate).collect();
        items.push(ScriptedItem::Error(SearchError::QuotaExceeded(
            "mock quota exhausted".to_string(),
        )));
        self.with_script(query, items)
    }

    /// Script `query` to fail immediately.
    pub fn with_error(self, query: &str, error: SearchError) -> Self {
        self.with_script(query, vec![ScriptedItem::Error(error)])
    }

    /// Delay every item of every script.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = Some(delay);
        self
    }

    pub fn with_playlist<I, S>(self, playlist: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut playlists) = self.playlists.try_write() {
            playlists.insert(playlist.to_string(), ids.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Replace the script for `query` on a shared mock.
    pub async fn set_script(&self, query: &str, items: Vec<ScriptedItem>) {
        self.scripts.write().await.insert(query.to_string(), items);
    }

    /// Get recorded searches.
    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Search streams started and not yet finished or dropped.
    pub fn active_searches(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of search streams open at the same time.
    pub fn peak_active_searches(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoSearcher for MockSearcher {
    fn name(&self) -> &str {
        "mock"
    }

    fn search(&self, request: &SearchRequest) -> CandidateStream {
        let scripts = Arc::clone(&self.scripts);
        let searches = Arc::clone(&self.searches);
        let request = request.clone();
        let item_delay = self.item_delay;
        let active = Arc::clone(&self.active);
        let peak_active = Arc::clone(&self.peak_active);

        stream::once(async move {
            let open = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak_active.fetch_max(open, Ordering::SeqCst);
            let guard = ActiveSearch(active);

            let items = scripts
                .read()
                .await
                .get(&request.query)
                .cloned()
                .unwrap_or_default();
            searches.write().await.push(RecordedSearch {
                request,
                timestamp: Instant::now(),
            });

            stream::unfold((items.into_iter(), guard), move |(mut items, guard)| async move {
                loop {
                    if let Some(delay) = item_delay {
                        tokio::time::sleep(delay).await;
                    }
                    match items.next()? {
                        ScriptedItem::Pause(pause) => tokio::time::sleep(pause).await,
                        ScriptedItem::Candidate(candidate) => {
                            return Some((Ok(candidate), (items, guard)))
                        }
                        ScriptedItem::Error(error) => return Some((Err(error), (items, guard))),
                    }
                }
            })
        })
        .flatten()
        .boxed()
    }

    async fn playlist_ids(&self, playlist: &str) -> Result<HashSet<String>, SearchError> {
        self.playlists
            .read()
            .await
            .get(playlist)
            .cloned()
            .ok_or_else(|| SearchError::Api(format!("playlist not found: {}", playlist)))
    }
}
