//! Per-query search stage.
//!
//! Wraps one backend search with exclusion filtering and scoring. The output
//! is a lazy stream: nothing is requested from the backend until it is polled,
//! and the consumer may stop pulling at any point.

mod types;

pub use types::*;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::searcher::{CandidateStream, SearchError, SearchRequest, VideoSearcher};
use crate::similarity::score_candidate;

/// Lazy sequence of scored results for one query.
///
/// A backend failure other than a malformed record is yielded once as the
/// last item.
pub type ScoredStream = BoxStream<'static, Result<ScoredResult, SearchError>>;

/// Filters and scores the candidates of one backend.
#[derive(Clone)]
pub struct SearchStage {
    searcher: Arc<dyn VideoSearcher>,
    exclusions: Arc<ExclusionSet>,
    max_results: u32,
}

impl SearchStage {
    pub fn new(
        searcher: Arc<dyn VideoSearcher>,
        exclusions: Arc<ExclusionSet>,
        max_results: u32,
    ) -> Self {
        Self {
            searcher,
            exclusions,
            max_results: max_results.max(1),
        }
    }

    pub fn searcher_name(&self) -> &str {
        self.searcher.name()
    }

    /// Start the stage for `query`.
    pub fn run(&self, query: &QuerySpec) -> ScoredStream {
        let cutoff = self.exclusions.effective_cutoff(query);
        let request = SearchRequest::new(query.text.clone(), self.max_results)
            .with_published_after(cutoff);

        let state = StageState {
            candidates: self.searcher.search(&request),
            exclusions: Arc::clone(&self.exclusions),
            query: query.text.clone(),
            cutoff,
        };

        stream::unfold(Some(state), |state| async move {
            let mut state = state?;
            match state.next_result().await {
                Some(Ok(result)) => Some((Ok(result), Some(state))),
                // Ends the stream after the error is delivered.
                Some(Err(e)) => Some((Err(e), None)),
                None => None,
            }
        })
        .boxed()
    }
}

struct StageState {
    candidates: CandidateStream,
    exclusions: Arc<ExclusionSet>,
    query: String,
    cutoff: Option<DateTime<Utc>>,
}

impl StageState {
    async fn next_result(&mut self) -> Option<Result<ScoredResult, SearchError>> {
        loop {
            match self.candidates.next().await? {
                Ok(candidate) => {
                    if let Some(reason) = self.exclusions.rejection(&candidate, self.cutoff) {
                        debug!(
                            query = %self.query,
                            video_id = %candidate.video_id,
                            reason = reason.as_str(),
                            "Dropped candidate"
                        );
                        continue;
                    }

                    let score = score_candidate(&candidate, &self.query);
                    return Some(Ok(ScoredResult {
                        video: candidate,
                        query: self.query.clone(),
                        score,
                    }));
                }
                Err(e) if e.is_record_level() => {
                    warn!(query = %self.query, error = %e, "Skipping malformed record");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
