//! Search run integration tests.
//!
//! These tests drive the aggregator with the scripted mock backend:
//! - Merge order independence and best-score dedup
//! - Exclusion and cutoff filtering
//! - Partial runs (quota, deadline) and persistence failures
//! - Result log round trip through the text store

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::TempDir;
use tokio::sync::mpsc;

use secretfills_core::{
    report::{self, SortOrder},
    testing::{fixtures, MemoryResultStore, MockSearcher, ScriptedItem},
    AggregateError, Aggregator, ExclusionSet, QueryFailure, QuerySpec, ResultEvent, ResultSet,
    ResultStore, RunConfig, ScoredResult, TextResultStore,
};

/// Test helper wiring a mock backend to an aggregator.
struct TestHarness {
    searcher: Arc<MockSearcher>,
    store: Arc<MemoryResultStore>,
    config: RunConfig,
}

impl TestHarness {
    fn new(searcher: MockSearcher) -> Self {
        Self::with_store(searcher, MemoryResultStore::new())
    }

    fn with_store(searcher: MockSearcher, store: MemoryResultStore) -> Self {
        Self {
            searcher: Arc::new(searcher),
            store: Arc::new(store),
            config: RunConfig {
                max_results: 2,
                concurrency: 4,
                deadline: None,
                channel_capacity: 16,
            },
        }
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.searcher.clone(), self.store.clone(), self.config.clone())
    }
}

fn queries(texts: &[&str]) -> Vec<QuerySpec> {
    texts.iter().map(|t| QuerySpec::new(*t)).collect()
}

#[test]
fn test_merge_is_order_independent() {
    let mut arrivals: Vec<ScoredResult> = Vec::new();
    for (i, score) in [40u8, 85, 85, 12, 99, 60, 60, 0, 100, 73].iter().enumerate() {
        let id = format!("v{}", i % 4);
        arrivals.push(fixtures::scored(&id, "title", &format!("query {}", i), *score));
    }

    let expected_set = ResultSet::from_results(arrivals.clone());
    let expected = expected_set.scores();
    let mut rng = StdRng::seed_from_u64(0x5ec7);

    for _ in 0..200 {
        arrivals.shuffle(&mut rng);
        let set = ResultSet::from_results(arrivals.clone());
        assert_eq!(set.scores(), expected);

        // Every id here has a single maximum, so the kept entry is fixed too.
        for id in ["v0", "v1", "v2", "v3"] {
            assert_eq!(set.get(id), expected_set.get(id), "entry for {}", id);
        }
    }

    assert_eq!(expected.get("v0"), Some(&100));
    assert_eq!(expected.get("v1"), Some(&85));
    let best_v0 = expected_set.get("v0").unwrap();
    assert_eq!(best_v0, &fixtures::scored("v0", "title", "query 8", 100));
    assert_eq!(expected_set.get("v1").unwrap().query, "query 1");
    assert_eq!(expected_set.get("v3").unwrap().query, "query 3");
}

#[test]
fn test_dedup_keeps_maximum_either_order() {
    for order in [[40u8, 85], [85, 40]] {
        let set = ResultSet::from_results(
            order
                .iter()
                .map(|score| fixtures::scored("same", "title", "q", *score)),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("same").map(|r| r.score), Some(85));
    }
}

#[test]
fn test_tie_keeps_first_seen_query() {
    let first = fixtures::scored("same", "title", "first query", 70);
    let second = fixtures::scored("same", "title", "second query", 70);

    let set = ResultSet::from_results([first, second]);
    assert_eq!(set.get("same").map(|r| r.query.as_str()), Some("first query"));
}

#[tokio::test]
async fn test_basic_scenario_two_candidates_scored() {
    let harness = TestHarness::new(MockSearcher::new().with_results(
        "foo bar",
        vec![
            fixtures::candidate("a1", "foo bar live", "X"),
            fixtures::candidate("a2", "unrelated", "X"),
        ],
    ));

    let outcome = harness
        .aggregator()
        .run(queries(&["foo bar"]), ExclusionSet::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    let live = outcome.results.get("a1").unwrap().score;
    let unrelated = outcome.results.get("a2").unwrap().score;
    assert!(live >= unrelated + 50, "{} vs {}", live, unrelated);
    assert!(outcome.is_complete());
}

#[tokio::test]
async fn test_same_video_from_two_queries_keeps_higher_score() {
    // "foo qux" scores the title at 57, "foo bar baz" at 100.
    let video = fixtures::candidate("v1", "foo bar baz", "X");
    let harness = TestHarness::new(
        MockSearcher::new()
            .with_results("foo qux", vec![video.clone()])
            .with_results("foo bar baz", vec![video]),
    );

    let outcome = harness
        .aggregator()
        .run(queries(&["foo qux", "foo bar baz"]), ExclusionSet::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results.get("v1").unwrap().score, 100);
    assert_eq!(outcome.stats.results_seen, 2);
    // The log keeps both results.
    assert_eq!(harness.store.appended().len(), 2);
}

#[tokio::test]
async fn test_excluded_uploader_never_appears() {
    let harness = TestHarness::new(
        MockSearcher::new()
            .with_results(
                "foo",
                vec![
                    fixtures::candidate("s1", "foo", "Spammer"),
                    fixtures::candidate("ok", "foo", "Fine"),
                ],
            )
            .with_results("bar", vec![fixtures::candidate("s2", "bar", "Spammer")]),
    );

    let outcome = harness
        .aggregator()
        .run(
            queries(&["foo", "bar"]),
            ExclusionSet::new().with_uploaders(["Spammer"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results.iter().all(|r| r.video.uploader != "Spammer"));
    assert!(harness
        .store
        .appended()
        .iter()
        .all(|r| r.video.uploader != "Spammer"));
}

#[tokio::test]
async fn test_cutoff_excludes_strictly_earlier() {
    let cutoff = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
    let harness = TestHarness::new(MockSearcher::new().with_results(
        "song",
        vec![
            fixtures::candidate_at("before", "song", "X", cutoff - chrono::Duration::seconds(1)),
            fixtures::candidate_at("at", "song", "X", cutoff),
            fixtures::candidate_at("after", "song", "X", cutoff + chrono::Duration::days(3)),
        ],
    ));

    let outcome = harness
        .aggregator()
        .run(
            vec![QuerySpec::new("song").with_cutoff(Some(cutoff))],
            ExclusionSet::new(),
        )
        .await
        .unwrap();

    assert!(outcome.results.get("before").is_none());
    assert!(outcome.results.get("at").is_some());
    assert!(outcome.results.get("after").is_some());
}

#[tokio::test]
async fn test_quota_on_one_query_keeps_partial_results() {
    let harness = TestHarness::new(
        MockSearcher::new()
            .with_quota_after("limited", vec![fixtures::candidate("l1", "limited", "X")])
            .with_results(
                "fine",
                vec![
                    fixtures::candidate("f1", "fine", "X"),
                    fixtures::candidate("f2", "fine too", "X"),
                ],
            ),
    );

    let outcome = harness
        .aggregator()
        .run(queries(&["limited", "fine"]), ExclusionSet::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.incomplete.len(), 1);
    assert_eq!(outcome.incomplete[0].query, "limited");
    assert!(matches!(
        outcome.incomplete[0].reason,
        QueryFailure::QuotaExceeded(_)
    ));
    assert_eq!(harness.store.appended().len(), 3);
}

#[tokio::test]
async fn test_concurrency_bound_limits_active_searches() {
    let mut searcher = MockSearcher::new().with_item_delay(Duration::from_millis(2));
    let texts: Vec<String> = (0..20).map(|i| format!("query {}", i)).collect();
    for (i, text) in texts.iter().enumerate() {
        searcher = searcher.with_results(
            text,
            vec![fixtures::candidate(&format!("v{}", i), text, "X")],
        );
    }
    let mut harness = TestHarness::new(searcher);
    harness.config.concurrency = 3;

    let outcome = harness
        .aggregator()
        .run(
            texts.iter().map(QuerySpec::new).collect(),
            ExclusionSet::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 20);
    assert_eq!(harness.searcher.search_count().await, 20);
    let peak = harness.searcher.peak_active_searches();
    assert!(peak <= 3, "{} searches were open at once", peak);
    assert!(peak >= 2, "searches never overlapped (peak {})", peak);
    assert_eq!(harness.searcher.active_searches(), 0);
    let queried: Vec<&str> = outcome.stats.per_query.iter().map(|q| q.query.as_str()).collect();
    assert_eq!(queried, texts.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_deadline_cancels_and_keeps_partial_results() {
    let harness = {
        let mut harness = TestHarness::new(
            MockSearcher::new()
                .with_script(
                    "slow",
                    vec![
                        ScriptedItem::Candidate(fixtures::candidate("s1", "slow", "X")),
                        ScriptedItem::Pause(Duration::from_secs(30)),
                        ScriptedItem::Candidate(fixtures::candidate("s2", "slow", "X")),
                    ],
                )
                .with_results("quick", vec![fixtures::candidate("q1", "quick", "X")]),
        );
        harness.config.deadline = Some(Duration::from_millis(100));
        harness
    };

    let started = std::time::Instant::now();
    let outcome = harness
        .aggregator()
        .run(queries(&["slow", "quick"]), ExclusionSet::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(outcome.results.get("s1").is_some());
    assert!(outcome.results.get("q1").is_some());
    assert!(outcome.results.get("s2").is_none());
    assert_eq!(outcome.incomplete.len(), 1);
    assert_eq!(outcome.incomplete[0].query, "slow");
    assert_eq!(outcome.incomplete[0].reason, QueryFailure::Cancelled);
    assert_eq!(harness.store.appended().len(), 2);
    assert_eq!(harness.store.flush_count(), 1);
}

#[tokio::test]
async fn test_store_failure_aborts_run() {
    let harness = TestHarness::with_store(
        MockSearcher::new().with_results(
            "many",
            (0..10)
                .map(|i| fixtures::candidate(&format!("v{}", i), "many", "X"))
                .collect(),
        ),
        MemoryResultStore::failing_after(3),
    );

    let err = harness
        .aggregator()
        .run(queries(&["many"]), ExclusionSet::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AggregateError::Persistence(_)));
    assert_eq!(harness.store.appended().len(), 3);
}

#[tokio::test]
async fn test_live_events_report_updates() {
    let video = fixtures::candidate("v1", "foo bar baz", "X");
    let mut harness = TestHarness::new(
        MockSearcher::new()
            .with_results("foo qux", vec![video.clone()])
            .with_results("foo bar baz", vec![video]),
    );
    // One worker at a time makes the arrival order fixed.
    harness.config.concurrency = 1;
    let (tx, mut rx) = mpsc::unbounded_channel();

    harness
        .aggregator()
        .with_events(tx)
        .run(queries(&["foo qux", "foo bar baz"]), ExclusionSet::new())
        .await
        .unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(matches!(first, ResultEvent::Added(_)));
    match second {
        ResultEvent::Updated {
            previous_score,
            result,
        } => {
            assert!(previous_score < 100);
            assert_eq!(result.score, 100);
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_text_store_round_trip_and_review() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results.txt");

    let harness = TestHarness::new(
        MockSearcher::new()
            .with_results(
                "a | b",
                vec![
                    fixtures::candidate("p1", "Song a | b (Live | Remaster)", "Band"),
                    fixtures::candidate("p2", "other", "Band"),
                ],
            )
            .with_results("song", vec![fixtures::candidate("p1", "Song a | b (Live | Remaster)", "Band")]),
    );
    let store = Arc::new(TextResultStore::create(&path).unwrap());
    let outcome = Aggregator::new(harness.searcher.clone(), store.clone(), harness.config.clone())
        .run(queries(&["a | b", "song"]), ExclusionSet::new())
        .await
        .unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(loaded
        .iter()
        .any(|r| r.video.title == "Song a | b (Live | Remaster)" && r.query == "a | b"));

    // Reviewing the log rebuilds the same best-score view.
    let reviewed = ResultSet::from_results(TextResultStore::read_file(&path).unwrap().results);
    assert_eq!(reviewed.scores(), outcome.results.scores());

    let mut by_id: HashMap<String, u8> = HashMap::new();
    for result in report::rank(reviewed, 0, SortOrder::Descending) {
        by_id.insert(result.video.video_id.clone(), result.score);
    }
    assert_eq!(by_id.len(), 2);
}
