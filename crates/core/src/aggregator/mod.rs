//! Concurrent search aggregation.
//!
//! Runs one [`SearchStage`](crate::stage::SearchStage) per query with bounded
//! concurrency and merges everything into a [`ResultSet`] that keeps the best
//! score per video. Every result is written to the
//! [`ResultStore`](crate::store::ResultStore) before it is merged, so the log
//! holds duplicates that the in-memory view drops.

mod result_set;
mod runner;
mod types;

pub use result_set::{rank_order, MergeOutcome, ResultSet};
pub use runner::Aggregator;
pub use types::*;
