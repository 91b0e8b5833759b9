//! Types for the aggregator.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::result_set::ResultSet;
use crate::config::SearchConfig;
use crate::searcher::SearchError;
use crate::stage::ScoredResult;
use crate::store::StoreError;

/// Per-run settings. Passed explicitly to each run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Candidates requested per query.
    pub max_results: u32,
    /// Queries searched at the same time.
    pub concurrency: usize,
    /// Cancel whatever is still running after this long.
    pub deadline: Option<Duration>,
    /// Results buffered between the workers and the merge loop.
    pub channel_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_results: 25,
            concurrency: 8,
            deadline: None,
            channel_capacity: 256,
        }
    }
}

impl From<&SearchConfig> for RunConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_results: config.max_results,
            concurrency: config.concurrency,
            deadline: config.deadline_secs.map(Duration::from_secs),
            channel_capacity: config.channel_capacity,
        }
    }
}

/// Change to the best-score view, emitted after each merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEvent {
    /// First result for this video id.
    Added(ScoredResult),
    /// A strictly better result replaced the stored one.
    Updated {
        previous_score: u8,
        result: ScoredResult,
    },
}

impl ResultEvent {
    pub fn result(&self) -> &ScoredResult {
        match self {
            ResultEvent::Added(result) => result,
            ResultEvent::Updated { result, .. } => result,
        }
    }
}

/// Why a query did not run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum QueryFailure {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("search failed: {0}")]
    Failed(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<SearchError> for QueryFailure {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::QuotaExceeded(msg) => QueryFailure::QuotaExceeded(msg),
            other => QueryFailure::Failed(other.to_string()),
        }
    }
}

/// A query that stopped early. Its results up to that point are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteQuery {
    pub query: String,
    pub reason: QueryFailure,
}

/// Results produced by one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub results: usize,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Results appended to the store.
    pub results_seen: usize,
    /// Distinct video ids in the final set.
    pub unique: usize,
    /// Results that replaced a lower-scoring one.
    pub replaced: usize,
    /// Results that lost to an equal or better one.
    pub discarded: usize,
    /// In query order.
    pub per_query: Vec<QueryCount>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub results: ResultSet,
    /// In query order.
    pub incomplete: Vec<IncompleteQuery>,
    pub stats: RunStats,
}

impl AggregateOutcome {
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("result store failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("search driver failed: {0}")]
    Driver(String),
}
