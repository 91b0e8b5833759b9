//! `secret-fills review`

use anyhow::{Context, Result};
use tracing::warn;

use secretfills_core::{Config, ResultSet, TextResultStore};

use super::{print_ranked, sort_order};
use crate::args::ReviewArgs;

pub fn run(config: &Config, args: ReviewArgs) -> Result<()> {
    let path = args
        .results
        .unwrap_or_else(|| config.storage.results_path.clone());
    let min_score = args.min_similarity.unwrap_or(config.search.min_score);

    let report = TextResultStore::read_file(&path)
        .with_context(|| format!("Failed to read result log {:?}", path))?;
    if report.skipped > 0 {
        warn!(skipped = report.skipped, path = %path.display(), "Some result lines could not be read");
    }

    let logged = report.results.len();
    let results = ResultSet::from_results(report.results);
    let unique = results.len();
    let shown = print_ranked(results, min_score, sort_order(args.descending));

    eprintln!(
        "{} results shown ({} unique, {} logged) from {}",
        shown,
        unique,
        logged,
        path.display()
    );
    Ok(())
}
