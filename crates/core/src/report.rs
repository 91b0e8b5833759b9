//! Ranked presentation of results.
//!
//! Display lines use the same field order as the result log:
//! `date | score | title | uploader | url`.

use console::{style, Color};

use crate::aggregator::{rank_order, IncompleteQuery, ResultEvent};
use crate::stage::ScoredResult;

/// Order of the final listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Worst first, so the best matches end up nearest the prompt.
    #[default]
    Ascending,
    Descending,
}

/// Similarity band used for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    /// Below 50.
    Low,
    /// 50 to 79.
    Medium,
    /// 80 and above.
    High,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            0..=49 => ScoreBand::Low,
            50..=79 => ScoreBand::Medium,
            _ => ScoreBand::High,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ScoreBand::Low => Color::Red,
            ScoreBand::Medium => Color::Yellow,
            ScoreBand::High => Color::Green,
        }
    }
}

/// Keep results scoring at least `min_score` and sort them.
///
/// Equal scores are ordered by publish date, then video id, so repeated
/// runs print the same listing.
pub fn rank(
    results: impl IntoIterator<Item = ScoredResult>,
    min_score: u8,
    order: SortOrder,
) -> Vec<ScoredResult> {
    let mut ranked: Vec<ScoredResult> = results
        .into_iter()
        .filter(|result| result.score >= min_score)
        .collect();

    ranked.sort_by(rank_order);
    if order == SortOrder::Ascending {
        ranked.reverse();
    }
    ranked
}

/// Uncoloured display line.
pub fn display_line(result: &ScoredResult) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        result.date(),
        result.padded_score(),
        result.video.title,
        result.video.uploader,
        result.video.url
    )
}

/// Display line with the score coloured by band.
///
/// Colour codes are only emitted when the terminal supports them.
pub fn styled_line(result: &ScoredResult) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        result.date(),
        style(result.padded_score()).fg(ScoreBand::of(result.score).color()),
        style(&result.video.title).green(),
        style(&result.video.uploader).yellow(),
        result.video.url
    )
}

/// Line for a live update during a run.
pub fn event_line(event: &ResultEvent) -> String {
    match event {
        ResultEvent::Added(result) => styled_line(result),
        ResultEvent::Updated {
            previous_score,
            result,
        } => format!(
            "{} {}",
            styled_line(result),
            style(format!("(was {:03})", previous_score)).dim()
        ),
    }
}

/// One line per query that didn't finish.
pub fn incomplete_lines(incomplete: &[IncompleteQuery]) -> Vec<String> {
    incomplete
        .iter()
        .map(|entry| format!("{}: {}", entry.query, entry.reason))
        .collect()
}
