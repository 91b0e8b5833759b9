//! Plain-text video id lists.
//!
//! One id per line. Used for the exclusion list (known uploads and false
//! positives) and for caching a playlist's ids between runs.

use std::collections::{BTreeSet, HashSet};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum KnownIdsError {
    #[error("failed to read id list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write id list {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse ids from text, ignoring blank lines and surrounding whitespace.
pub fn parse_ids(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Load an id list. A missing file is an empty list.
pub fn load_ids(path: &Path) -> Result<HashSet<String>, KnownIdsError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let ids = parse_ids(&text);
            debug!(path = %path.display(), count = ids.len(), "Loaded id list");
            Ok(ids)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Id list not found, using empty list");
            Ok(HashSet::new())
        }
        Err(source) => Err(KnownIdsError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `ids` to `path`, sorted, replacing any previous contents.
pub fn save_ids(path: &Path, ids: &HashSet<String>) -> Result<(), KnownIdsError> {
    let sorted: BTreeSet<&String> = ids.iter().collect();
    let mut text = String::new();
    for id in sorted {
        text.push_str(id);
        text.push('\n');
    }

    std::fs::write(path, text).map_err(|source| KnownIdsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = ids.len(), "Saved id list");
    Ok(())
}

/// Append the ids not already listed in `path`, creating it if needed.
///
/// Returns how many ids were written.
pub fn append_ids<I, S>(path: &Path, ids: I) -> Result<usize, KnownIdsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let existing_text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(KnownIdsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut known = parse_ids(&existing_text);

    let mut text = String::new();
    if !existing_text.is_empty() && !existing_text.ends_with('\n') {
        text.push('\n');
    }
    let mut added = 0;
    for id in ids {
        let id = id.as_ref().trim();
        if id.is_empty() || !known.insert(id.to_string()) {
            continue;
        }
        text.push_str(id);
        text.push('\n');
        added += 1;
    }

    if added == 0 {
        return Ok(0);
    }

    let write_err = |source| KnownIdsError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(text.as_bytes()).map_err(write_err)?;

    info!(path = %path.display(), added, "Appended ids");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ids_skips_blank_lines() {
        let ids = parse_ids("abc\n\n  def  \r\nabc\n");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("abc"));
        assert!(ids.contains("def"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ids = load_ids(&dir.path().join("exclude_ids.txt")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("known_ids.txt");
        let ids: HashSet<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();

        save_ids(&path, &ids).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
        assert_eq!(load_ids(&path).unwrap(), ids);
    }

    #[test]
    fn test_append_skips_known_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exclude_ids.txt");
        std::fs::write(&path, "old").unwrap();

        let added = append_ids(&path, ["old", "new1", "new1", " new2 ", ""]).unwrap();
        assert_eq!(added, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew1\nnew2\n");

        assert_eq!(append_ids(&path, ["old", "new2"]).unwrap(), 0);
    }

    #[test]
    fn test_append_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.txt");

        assert_eq!(append_ids(&path, vec!["x".to_string()]).unwrap(), 1);
        assert_eq!(load_ids(&path).unwrap().len(), 1);
    }
}
