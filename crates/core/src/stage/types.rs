//! Types shared by the search stage, the aggregator and the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::searcher::VideoCandidate;

/// One query to run, with its own optional publish cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub text: String,
    /// Overrides the run-wide cutoff when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<DateTime<Utc>>,
}

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cutoff: None,
        }
    }

    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.cutoff = cutoff;
        self
    }
}

/// Filtering criteria for a run.
///
/// Built once before the run and shared read-only by every stage.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    /// Uploader names to drop (exact match).
    pub uploaders: HashSet<String>,
    /// Video ids already known (exact match).
    pub video_ids: HashSet<String>,
    /// Default publish cutoff for queries without their own.
    pub cutoff: Option<DateTime<Utc>>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uploaders<I, S>(mut self, uploaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uploaders.extend(uploaders.into_iter().map(Into::into));
        self
    }

    pub fn with_video_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.video_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Cutoff that applies to `query`: its own, else the run-wide one.
    pub fn effective_cutoff(&self, query: &QuerySpec) -> Option<DateTime<Utc>> {
        query.cutoff.or(self.cutoff)
    }

    /// Why a candidate would be dropped, checked in a fixed order:
    /// uploader, then id, then cutoff.
    pub fn rejection(
        &self,
        candidate: &VideoCandidate,
        cutoff: Option<DateTime<Utc>>,
    ) -> Option<Rejection> {
        if self.uploaders.contains(&candidate.uploader) {
            return Some(Rejection::Uploader);
        }
        if self.video_ids.contains(&candidate.video_id) {
            return Some(Rejection::KnownId);
        }
        match cutoff {
            Some(cutoff) if candidate.published_at < cutoff => Some(Rejection::BeforeCutoff),
            _ => None,
        }
    }
}

/// Reason a candidate was filtered out by the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Uploader,
    KnownId,
    BeforeCutoff,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Uploader => "excluded uploader",
            Rejection::KnownId => "known id",
            Rejection::BeforeCutoff => "before cutoff",
        }
    }
}

/// A candidate paired with the query that found it and its score against that query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub video: VideoCandidate,
    pub query: String,
    /// Similarity in `[0, 100]`.
    pub score: u8,
}

impl ScoredResult {
    pub fn video_id(&self) -> &str {
        &self.video.video_id
    }

    pub fn date(&self) -> String {
        self.video.published_date()
    }

    /// Score as shown to users, zero padded to three digits.
    pub fn padded_score(&self) -> String {
        format!("{:03}", self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(id: &str, uploader: &str, published_at: DateTime<Utc>) -> VideoCandidate {
        VideoCandidate {
            video_id: id.to_string(),
            title: "title".to_string(),
            description: None,
            uploader: uploader.to_string(),
            published_at,
            url: format!("https://youtu.be/{}", id),
        }
    }

    #[test]
    fn test_effective_cutoff_prefers_query() {
        let global = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let own = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let exclusions = ExclusionSet::new().with_cutoff(Some(global));

        assert_eq!(
            exclusions.effective_cutoff(&QuerySpec::new("a").with_cutoff(Some(own))),
            Some(own)
        );
        assert_eq!(exclusions.effective_cutoff(&QuerySpec::new("a")), Some(global));
        assert_eq!(
            ExclusionSet::new().effective_cutoff(&QuerySpec::new("a")),
            None
        );
    }

    #[test]
    fn test_rejection_order() {
        let at = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let exclusions = ExclusionSet::new()
            .with_uploaders(["Spam"])
            .with_video_ids(["known"]);

        let c = candidate("known", "Spam", at);
        assert_eq!(exclusions.rejection(&c, Some(later)), Some(Rejection::Uploader));

        let c = candidate("known", "Someone", at);
        assert_eq!(exclusions.rejection(&c, Some(later)), Some(Rejection::KnownId));

        let c = candidate("new", "Someone", at);
        assert_eq!(
            exclusions.rejection(&c, Some(later)),
            Some(Rejection::BeforeCutoff)
        );
        assert_eq!(exclusions.rejection(&c, None), None);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let cutoff = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let exclusions = ExclusionSet::new();

        let at = candidate("a", "x", cutoff);
        assert_eq!(exclusions.rejection(&at, Some(cutoff)), None);

        let before = candidate("b", "x", cutoff - chrono::Duration::seconds(1));
        assert_eq!(
            exclusions.rejection(&before, Some(cutoff)),
            Some(Rejection::BeforeCutoff)
        );
    }

    #[test]
    fn test_uploader_match_is_exact() {
        let exclusions = ExclusionSet::new().with_uploaders(["Spam"]);
        let c = candidate("a", "spam", Utc::now());
        assert_eq!(exclusions.rejection(&c, None), None);
    }

    #[test]
    fn test_scored_result_display_fields() {
        let result = ScoredResult {
            video: candidate(
                "abc",
                "x",
                Utc.with_ymd_and_hms(2021, 3, 9, 12, 0, 0).unwrap(),
            ),
            query: "q".to_string(),
            score: 7,
        };
        assert_eq!(result.video_id(), "abc");
        assert_eq!(result.date(), "2021-03-09");
        assert_eq!(result.padded_score(), "007");
    }
}
