//! Partial-match text similarity.
//!
//! Answers "does this title contain or resemble the query": the shorter text
//! is aligned against the best-matching stretch of the longer one, so a query
//! embedded in a long title still scores 100.

use crate::searcher::VideoCandidate;

/// Similarity of two texts in `[0, 100]`.
///
/// Case-insensitive. The shorter text is matched against every substring of
/// the longer text; the score is `1 - edits / len(shorter)` for the cheapest
/// alignment. Either side empty scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (distance, len) = if a.len() < b.len() {
        (substring_distance(&a, &b), a.len())
    } else if b.len() < a.len() {
        (substring_distance(&b, &a), b.len())
    } else {
        // Equal lengths: either side may be the better needle.
        (
            substring_distance(&a, &b).min(substring_distance(&b, &a)),
            a.len(),
        )
    };

    let similarity = 1.0 - distance as f64 / len as f64;
    (similarity.max(0.0) * 100.0).round() as u8
}

/// Relevance of a candidate to the query that produced it.
///
/// Takes the better of the title and description scores; a strong match on
/// either field is never diluted by the other.
pub fn score_candidate(candidate: &VideoCandidate, query: &str) -> u8 {
    let title = partial_ratio(&candidate.title, query);

    match candidate.description.as_deref() {
        Some(description) if !description.is_empty() && title < 100 => {
            title.max(partial_ratio(description, query))
        }
        _ => title,
    }
}

/// Minimum Levenshtein distance between `needle` and any substring of
/// `haystack`.
///
/// Standard edit-distance table where the first row is all zeros (the match
/// may start anywhere) and the answer is the minimum of the last row (it may
/// end anywhere). Only two rows are kept.
fn substring_distance(needle: &[char], haystack: &[char]) -> usize {
    let mut previous = vec![0usize; haystack.len() + 1];
    let mut current = vec![0usize; haystack.len() + 1];

    for (i, n_char) in needle.iter().enumerate() {
        current[0] = i + 1;
        for (j, h_char) in haystack.iter().enumerate() {
            let cost = if n_char == h_char { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous.into_iter().min().unwrap_or(needle.len())
}
