pub mod ids;
pub mod review;
pub mod search;

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use secretfills_core::{
    report::{self, SortOrder},
    Config, SanitizedConfig, ScoredResult,
};

pub fn show_config(config: &Config) -> Result<()> {
    let sanitized = SanitizedConfig::from(config);
    let json = serde_json::to_string_pretty(&sanitized).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

/// Print the final listing to stdout.
pub fn print_ranked(
    results: impl IntoIterator<Item = ScoredResult>,
    min_score: u8,
    order: SortOrder,
) -> usize {
    let ranked = report::rank(results, min_score, order);
    for result in &ranked {
        println!("{}", report::styled_line(result));
    }
    ranked.len()
}

pub fn sort_order(descending: bool) -> SortOrder {
    if descending {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

/// Spinner on stderr; hidden in quiet mode.
pub fn create_spinner(msg: &str, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}
