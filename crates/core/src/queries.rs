//! Query list sources.
//!
//! A query file is either a CSV table with `Date` and `Title` columns (the
//! date becomes the query's publish cutoff) or a plain list with one title per
//! line. The header row decides which.

use chrono::{NaiveDate, TimeZone, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::stage::QuerySpec;

#[derive(Debug, Error)]
pub enum QueryFileError {
    #[error("failed to read query file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid query file row {line}: {reason}")]
    InvalidRow { line: usize, reason: String },
}

/// Queries given directly, without cutoffs. Blank entries are dropped.
pub fn ad_hoc<I, S>(queries: I) -> Vec<QuerySpec>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    queries
        .into_iter()
        .map(|q| q.as_ref().trim().to_string())
        .filter(|q| !q.is_empty())
        .map(QuerySpec::new)
        .collect()
}

/// Read queries from a file.
pub fn load_query_file(path: &Path) -> Result<Vec<QuerySpec>, QueryFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| QueryFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let queries = parse_query_file(&text)?;
    debug!(path = %path.display(), count = queries.len(), "Loaded query file");
    Ok(queries)
}

/// Parse query file contents. See the module docs for the accepted layouts.
pub fn parse_query_file(text: &str) -> Result<Vec<QuerySpec>, QueryFileError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Ok(Vec::new());
    };

    let columns = match split_csv_record(header) {
        Ok(fields) => TableColumns::find(&fields),
        Err(_) => None,
    };

    let Some(columns) = columns else {
        // Plain list; the first line is a title too.
        return Ok(std::iter::once((header_line, header))
            .chain(lines)
            .map(|(_, line)| QuerySpec::new(line.trim()))
            .collect());
    };

    lines
        .map(|(line_number, line)| parse_row(&columns, line_number, line))
        .collect()
}

/// Positions of the `Date` and `Title` columns.
struct TableColumns {
    date: usize,
    title: usize,
}

impl TableColumns {
    fn find(header: &[String]) -> Option<Self> {
        let position =
            |name: &str| header.iter().position(|field| field.trim().eq_ignore_ascii_case(name));
        Some(Self {
            date: position("date")?,
            title: position("title")?,
        })
    }
}

fn parse_row(
    columns: &TableColumns,
    line_number: usize,
    line: &str,
) -> Result<QuerySpec, QueryFileError> {
    let invalid = |reason: String| QueryFileError::InvalidRow {
        line: line_number,
        reason,
    };

    let fields = split_csv_record(line).map_err(invalid)?;
    let field = |index: usize, name: &str| {
        fields
            .get(index)
            .map(|f| f.trim())
            .ok_or_else(|| invalid(format!("missing {} column", name)))
    };

    let title = field(columns.title, "Title")?;
    if title.is_empty() {
        return Err(invalid("empty title".to_string()));
    }

    let date = field(columns.date, "Date")?;
    let cutoff = if date.is_empty() {
        None
    } else {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| invalid(format!("bad date {:?}: {}", date, e)))?;
        Some(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
    };

    Ok(QuerySpec::new(title).with_cutoff(cutoff))
}

/// Split one CSV record. Fields may be double-quoted, with `""` as an
/// escaped quote inside a quoted field.
fn split_csv_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}
