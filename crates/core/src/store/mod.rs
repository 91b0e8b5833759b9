//! Append-only result log.
//!
//! Every scored result is appended as it is produced, duplicates included.
//! The log is the durable record of a run; the in-memory best-score view is
//! rebuilt from it on review.

mod text;

pub use text::{format_line, parse_line, LoadReport, TextResultStore};

use thiserror::Error;

use crate::stage::ScoredResult;

/// Errors from result persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record on line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

/// Durable storage for scored results.
///
/// Appends may come from any task; implementations must write each result as
/// one indivisible unit.
pub trait ResultStore: Send + Sync {
    /// Append one result.
    fn append(&self, result: &ScoredResult) -> Result<(), StoreError>;

    /// Load every result in append order.
    fn load_all(&self) -> Result<Vec<ScoredResult>, StoreError>;

    /// Push buffered writes to durable storage.
    fn flush(&self) -> Result<(), StoreError>;
}
