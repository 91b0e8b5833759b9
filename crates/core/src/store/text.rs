//! Pipe-delimited text result log.
//!
//! One result per line:
//!
//! ```text
//! 2023-04-01 | 087 | Some Title | Uploader | https://youtu.be/abc | abc | some%20query
//! ```
//!
//! The title is the only field that may contain `|`, so a reader takes the
//! date and score from the left and the remaining fields from the right.
//! The query is percent-encoded, every `|` in the uploader becomes `/` and
//! every `|` in the url becomes `%7C`, so none of the right-hand fields can
//! contain or touch a separator.

use chrono::{NaiveDate, TimeZone, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{ResultStore, StoreError};
use crate::searcher::VideoCandidate;
use crate::stage::ScoredResult;

const SEPARATOR: &str = " | ";

/// Results read back from a log, with the count of lines that could not be parsed.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub results: Vec<ScoredResult>,
    pub skipped: usize,
}

/// Text file implementation of [`ResultStore`].
pub struct TextResultStore {
    path: PathBuf,
    writer: Mutex<LineWriter<File>>,
}

impl TextResultStore {
    /// Open `path` for a fresh run, truncating earlier contents.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(path, false)
    }

    /// Open `path` keeping earlier runs; new results go at the end.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(path, true)
    }

    pub fn open(path: impl AsRef<Path>, append: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }

        let file = options.open(&path)?;
        debug!(path = %path.display(), append, "Opened result log");

        Ok(Self {
            path,
            writer: Mutex::new(LineWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a log without opening it for writing.
    pub fn read_file(path: impl AsRef<Path>) -> Result<LoadReport, StoreError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut report = LoadReport::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line) {
                Ok(result) => report.results.push(result),
                Err(reason) => {
                    let err = StoreError::Corrupt {
                        line: index + 1,
                        reason,
                    };
                    warn!(path = %path.display(), error = %err, "Skipping result line");
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LineWriter<File>>, StoreError> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Io(io::Error::other("result log lock poisoned")))
    }
}

impl ResultStore for TextResultStore {
    fn append(&self, result: &ScoredResult) -> Result<(), StoreError> {
        let mut line = format_line(result);
        line.push('\n');

        let mut writer = self.lock()?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ScoredResult>, StoreError> {
        self.flush()?;
        Ok(Self::read_file(&self.path)?.results)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut writer = self.lock()?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// Render one result as a log line (without the trailing newline).
pub fn format_line(result: &ScoredResult) -> String {
    let video = &result.video;
    [
        result.date(),
        result.padded_score(),
        single_line(&video.title),
        single_line(&video.uploader).replace('|', "/"),
        single_line(&video.url).replace('|', "%7C"),
        single_line(&video.video_id),
        urlencoding::encode(&result.query).into_owned(),
    ]
    .join(SEPARATOR)
}

/// Parse one log line. The error is a human-readable reason.
pub fn parse_line(line: &str) -> Result<ScoredResult, String> {
    let mut left = line.splitn(3, SEPARATOR);
    let date = left.next().ok_or("empty line")?;
    let score = left.next().ok_or("missing score")?;
    let rest = left.next().ok_or("missing title")?;

    let mut right = rest.rsplitn(5, SEPARATOR);
    let query = right.next().ok_or("missing query")?;
    let video_id = right.next().ok_or("missing video id")?;
    let url = right.next().ok_or("missing url")?;
    let uploader = right.next().ok_or("missing uploader")?;
    let title = right.next().ok_or("missing title")?;

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date {:?}: {}", date, e))?;
    let published_at = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));

    let score: u8 = score
        .trim()
        .parse()
        .map_err(|e| format!("bad score {:?}: {}", score, e))?;
    if score > 100 {
        return Err(format!("score {} out of range", score));
    }

    if video_id.is_empty() {
        return Err("empty video id".to_string());
    }

    let query = urlencoding::decode(query)
        .map_err(|e| format!("bad query encoding: {}", e))?
        .into_owned();

    Ok(ScoredResult {
        video: VideoCandidate {
            video_id: video_id.to_string(),
            title: title.to_string(),
            description: None,
            uploader: uploader.to_string(),
            published_at,
            url: url.to_string(),
        },
        query,
        score,
    })
}

fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], " ")
}
