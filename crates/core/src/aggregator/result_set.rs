//! Best-score view over all results of a run.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::stage::ScoredResult;

/// What [`ResultSet::merge`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced { previous_score: u8 },
    /// An equal or higher score was already stored.
    Discarded,
}

/// Highest-scoring result per video id.
///
/// A result replaces the stored one only when its score is strictly greater,
/// so for equal scores the first result seen stays. The final contents don't
/// depend on arrival order except for which query is kept on a tie.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: HashMap<String, ScoredResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the view from results in the order they were produced.
    pub fn from_results(results: impl IntoIterator<Item = ScoredResult>) -> Self {
        let mut set = Self::new();
        for result in results {
            set.merge(result);
        }
        set
    }

    pub fn merge(&mut self, result: ScoredResult) -> MergeOutcome {
        match self.entries.get_mut(result.video_id()) {
            None => {
                self.entries.insert(result.video.video_id.clone(), result);
                MergeOutcome::Inserted
            }
            Some(existing) if result.score > existing.score => {
                let previous_score = existing.score;
                *existing = result;
                MergeOutcome::Replaced { previous_score }
            }
            Some(_) => MergeOutcome::Discarded,
        }
    }

    pub fn get(&self, video_id: &str) -> Option<&ScoredResult> {
        self.entries.get(video_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredResult> {
        self.entries.values()
    }

    /// Video id to score, for comparing sets.
    pub fn scores(&self) -> HashMap<String, u8> {
        self.entries
            .iter()
            .map(|(id, result)| (id.clone(), result.score))
            .collect()
    }

    /// All results, best first. Equal scores are ordered by newest publish
    /// date, then by video id, so the order is stable across runs.
    pub fn into_ranked(self) -> Vec<ScoredResult> {
        let mut results: Vec<ScoredResult> = self.entries.into_values().collect();
        results.sort_by(rank_order);
        results
    }
}

/// Best-first ordering used for ranked output.
pub fn rank_order(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.video.published_at.cmp(&a.video.published_at))
        .then_with(|| a.video.video_id.cmp(&b.video.video_id))
}

impl IntoIterator for ResultSet {
    type Item = ScoredResult;
    type IntoIter = std::collections::hash_map::IntoValues<String, ScoredResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
