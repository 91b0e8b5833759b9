//! Fan-out driver and merge loop.
//!
//! - Workers: one per query, at most `concurrency` in flight, all driven by a
//!   single spawned task.
//! - Merge loop: the only owner of the [`ResultSet`]. Each result is appended
//!   to the store and then merged before the next one is taken.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::result_set::{MergeOutcome, ResultSet};
use super::types::{
    AggregateError, AggregateOutcome, IncompleteQuery, QueryCount, QueryFailure, ResultEvent,
    RunConfig, RunStats,
};
use crate::searcher::VideoSearcher;
use crate::stage::{ExclusionSet, QuerySpec, ScoredResult, SearchStage};
use crate::store::ResultStore;

/// How one worker ended.
#[derive(Debug)]
struct WorkerReport {
    index: usize,
    query: String,
    results: usize,
    failure: Option<QueryFailure>,
}

/// Runs many queries against one backend and merges their results.
pub struct Aggregator {
    searcher: Arc<dyn VideoSearcher>,
    store: Arc<dyn ResultStore>,
    config: RunConfig,
    events: Option<mpsc::UnboundedSender<ResultEvent>>,
    cancel: CancellationToken,
}

impl Aggregator {
    pub fn new(
        searcher: Arc<dyn VideoSearcher>,
        store: Arc<dyn ResultStore>,
        config: RunConfig,
    ) -> Self {
        Self {
            searcher,
            store,
            config,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Receive a [`ResultEvent`] for every change to the best-score view.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ResultEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop runs when `token` is cancelled, e.g. on Ctrl-C.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Search every query and merge the results.
    ///
    /// Per-query failures don't stop the run; they are listed in
    /// [`AggregateOutcome::incomplete`]. A store failure aborts it.
    pub async fn run(
        &self,
        queries: Vec<QuerySpec>,
        exclusions: ExclusionSet,
    ) -> Result<AggregateOutcome, AggregateError> {
        let total = queries.len();
        let concurrency = self.config.concurrency.max(1);
        info!(
            backend = self.searcher.name(),
            queries = total,
            concurrency,
            max_results = self.config.max_results,
            "Starting search run"
        );

        let cancel = self.cancel.child_token();
        // Stops the deadline timer once the run returns.
        let _cancel_on_exit = cancel.clone().drop_guard();
        if let Some(deadline) = self.config.deadline {
            let timer = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        warn!(?deadline, "Search deadline reached, cancelling remaining queries");
                        timer.cancel();
                    }
                    _ = timer.cancelled() => {}
                }
            });
        }

        let stage = SearchStage::new(
            Arc::clone(&self.searcher),
            Arc::new(exclusions),
            self.config.max_results,
        );
        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let driver_cancel = cancel.clone();
        let driver = tokio::spawn(async move {
            stream::iter(queries.into_iter().enumerate())
                .map(|(index, query)| {
                    run_worker(index, stage.clone(), query, tx.clone(), driver_cancel.clone())
                })
                .buffer_unordered(concurrency)
                .collect::<Vec<WorkerReport>>()
                .await
            // `tx` drops here, which ends the merge loop.
        });

        let mut results = ResultSet::new();
        let mut stats = RunStats::default();
        let mut store_error = None;

        while let Some(result) = rx.recv().await {
            if let Err(e) = self.store.append(&result) {
                error!(video_id = %result.video_id(), error = %e, "Failed to persist result, aborting run");
                cancel.cancel();
                rx.close();
                store_error = Some(e);
                break;
            }
            stats.results_seen += 1;
            self.merge(&mut results, &mut stats, result);
        }

        let mut reports = driver
            .await
            .map_err(|e| AggregateError::Driver(e.to_string()))?;

        if let Some(e) = store_error {
            if let Err(flush_err) = self.store.flush() {
                warn!(error = %flush_err, "Failed to flush result store after error");
            }
            return Err(AggregateError::Persistence(e));
        }
        self.store.flush()?;

        reports.sort_by_key(|report| report.index);
        let mut incomplete = Vec::new();
        for report in reports {
            stats.per_query.push(QueryCount {
                query: report.query.clone(),
                results: report.results,
            });
            if let Some(reason) = report.failure {
                incomplete.push(IncompleteQuery {
                    query: report.query,
                    reason,
                });
            }
        }
        stats.unique = results.len();

        info!(
            seen = stats.results_seen,
            unique = stats.unique,
            replaced = stats.replaced,
            incomplete = incomplete.len(),
            "Search run finished"
        );

        Ok(AggregateOutcome {
            results,
            incomplete,
            stats,
        })
    }

    fn merge(&self, results: &mut ResultSet, stats: &mut RunStats, result: ScoredResult) {
        let copy = self.events.as_ref().map(|_| result.clone());

        let event = match results.merge(result) {
            MergeOutcome::Inserted => copy.map(ResultEvent::Added),
            MergeOutcome::Replaced { previous_score } => {
                stats.replaced += 1;
                copy.map(|result| ResultEvent::Updated {
                    previous_score,
                    result,
                })
            }
            MergeOutcome::Discarded => {
                stats.discarded += 1;
                None
            }
        };

        if let (Some(events), Some(event)) = (&self.events, event) {
            // The receiver going away only stops the live display.
            let _ = events.send(event);
        }
    }
}

/// Pull one query's stage to the end, forwarding results to the merge loop.
async fn run_worker(
    index: usize,
    stage: SearchStage,
    query: QuerySpec,
    tx: mpsc::Sender<ScoredResult>,
    cancel: CancellationToken,
) -> WorkerReport {
    let mut report = WorkerReport {
        index,
        query: query.text.clone(),
        results: 0,
        failure: None,
    };

    if cancel.is_cancelled() {
        report.failure = Some(QueryFailure::Cancelled);
        return report;
    }

    debug!(query = %query.text, "Query started");
    let mut stream = stage.run(&query);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.failure = Some(QueryFailure::Cancelled);
                break;
            }
            next = stream.next() => next,
        };

        match next {
            None => break,
            Some(Ok(result)) => {
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    sent = tx.send(result) => sent.is_ok(),
                };
                if !sent {
                    report.failure = Some(QueryFailure::Cancelled);
                    break;
                }
                report.results += 1;
            }
            Some(Err(e)) => {
                if e.is_quota_exceeded() {
                    warn!(query = %query.text, error = %e, "Quota exceeded, keeping partial results");
                } else {
                    warn!(query = %query.text, error = %e, "Query failed");
                }
                report.failure = Some(e.into());
                break;
            }
        }
    }

    debug!(
        query = %query.text,
        results = report.results,
        failure = ?report.failure,
        "Query finished"
    );
    report
}
