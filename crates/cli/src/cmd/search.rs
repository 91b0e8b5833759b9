//! `secret-fills search`

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveTime, TimeZone, Utc};
use console::style;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use secretfills_core::{
    known_ids, queries, report,
    searcher::{create_searcher, playlist_id_from},
    validate_config, Aggregator, Config, ExclusionSet, QuerySpec, ResultEvent, RunConfig,
    TextResultStore, VideoSearcher,
};

use super::{create_spinner, print_ranked, sort_order};
use crate::args::SearchArgs;

pub async fn run(mut config: Config, args: SearchArgs) -> Result<()> {
    apply_overrides(&mut config, &args);
    validate_config(&config).context("Configuration validation failed")?;

    let query_list = collect_queries(&args)?;
    if query_list.is_empty() {
        bail!("Nothing to search: pass --search-terms or --queries-file");
    }

    let searcher = create_searcher(&config).context("Failed to create searcher")?;
    info!(backend = searcher.name(), queries = query_list.len(), "Searching");

    let spinner = create_spinner("Collecting known ids", args.quiet);
    let exclusions = build_exclusions(&config, &args, searcher.as_ref()).await?;

    let results_path = &config.storage.results_path;
    let store = Arc::new(
        TextResultStore::open(results_path, config.storage.append_results)
            .with_context(|| format!("Failed to open result log {:?}", results_path))?,
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the results found so far");
            ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<ResultEvent>();
    let live = spinner.clone();
    let quiet = args.quiet;
    let display = tokio::spawn(async move {
        let mut shown = 0usize;
        while let Some(event) = rx.recv().await {
            if matches!(event, ResultEvent::Added(_)) {
                shown += 1;
            }
            if !quiet {
                live.println(report::event_line(&event));
            }
            live.set_message(format!("Searching ({} results)", shown));
        }
    });

    spinner.set_message("Searching");
    let outcome = Aggregator::new(searcher, store, RunConfig::from(&config.search))
        .with_events(tx)
        .with_cancellation(cancel)
        .run(query_list, exclusions)
        .await
        .context("Search run failed")?;

    display.await.context("Live display task failed")?;
    spinner.finish_and_clear();

    let min_score = config.search.min_score;
    let shown = print_ranked(outcome.results, min_score, sort_order(args.descending));

    eprintln!(
        "{} results shown ({} unique, {} seen), log written to {}",
        shown,
        outcome.stats.unique,
        outcome.stats.results_seen,
        results_path.display()
    );

    if !outcome.incomplete.is_empty() {
        eprintln!(
            "{}",
            style(format!("{} queries did not complete:", outcome.incomplete.len()))
                .red()
                .bold()
        );
        for line in report::incomplete_lines(&outcome.incomplete) {
            eprintln!("  {}", line);
        }
    }

    Ok(())
}

/// Flags take precedence over the config file.
fn apply_overrides(config: &mut Config, args: &SearchArgs) {
    let search = &mut config.search;
    if let Some(max_results) = args.max_results {
        search.max_results = max_results;
    }
    if let Some(min_score) = args.min_similarity {
        search.min_score = min_score;
    }
    if let Some(backend) = args.backend {
        search.backend = backend.into();
    }
    if let Some(concurrency) = args.concurrency {
        search.concurrency = concurrency;
    }
    if let Some(deadline) = args.deadline_secs {
        search.deadline_secs = Some(deadline);
    }
    search
        .ignored_uploaders
        .extend(args.ignored_uploaders.iter().cloned());

    let storage = &mut config.storage;
    if let Some(path) = &args.exclude_ids {
        storage.exclude_ids_path = path.clone();
    }
    if let Some(path) = &args.results {
        storage.results_path = path.clone();
    }
    if args.append {
        storage.append_results = true;
    }
}

/// File queries first, then ad hoc ones.
fn collect_queries(args: &SearchArgs) -> Result<Vec<QuerySpec>> {
    let mut list = Vec::new();
    if let Some(path) = &args.queries_file {
        list.extend(
            queries::load_query_file(path)
                .with_context(|| format!("Failed to read queries from {:?}", path))?,
        );
    }
    list.extend(queries::ad_hoc(&args.search_terms));
    Ok(list)
}

async fn build_exclusions(
    config: &Config,
    args: &SearchArgs,
    searcher: &dyn VideoSearcher,
) -> Result<ExclusionSet> {
    let exclude_path = &config.storage.exclude_ids_path;
    let mut ids = known_ids::load_ids(exclude_path)
        .with_context(|| format!("Failed to read exclusion list {:?}", exclude_path))?;

    for path in &args.known_ids {
        let known = known_ids::load_ids(path)
            .with_context(|| format!("Failed to read id list {:?}", path))?;
        ids.extend(known);
    }

    if let Some(playlist) = &args.playlist {
        let playlist_ids = searcher
            .playlist_ids(playlist)
            .await
            .with_context(|| format!("Failed to list playlist {}", playlist_id_from(playlist)))?;
        info!(count = playlist_ids.len(), "Excluding playlist videos");
        ids.extend(playlist_ids);
    }

    let cutoff = args
        .after
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));

    Ok(ExclusionSet::new()
        .with_uploaders(config.search.ignored_uploaders.iter().cloned())
        .with_video_ids(ids)
        .with_cutoff(cutoff))
}
