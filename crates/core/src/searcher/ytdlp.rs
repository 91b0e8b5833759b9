//! yt-dlp subprocess search backend.
//!
//! Runs `yt-dlp -j ytsearchN:<query>` and reads one JSON object per line of
//! stdout. The process is only spawned once the stream is first polled and is
//! killed if the stream is dropped early.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::YtDlpConfig;

use super::{
    playlist_id_from, CandidateStream, SearchError, SearchRequest, VideoCandidate, VideoSearcher,
};

/// yt-dlp search backend.
pub struct YtDlpSearcher {
    config: Arc<YtDlpConfig>,
}

impl YtDlpSearcher {
    pub fn new(config: YtDlpConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Arguments for a search run. Extra args go first so they can't be
    /// mistaken for the search target.
    fn search_args(&self, request: &SearchRequest) -> Vec<String> {
        let mut args = self.config.extra_args.clone();
        args.push("-j".to_string());
        args.push(format!("ytsearch{}:{}", request.max_results, request.query));
        args
    }

    fn playlist_args(&self, playlist: &str) -> Vec<String> {
        let target = if playlist.contains("://") {
            playlist.trim().to_string()
        } else {
            format!(
                "https://www.youtube.com/playlist?list={}",
                playlist_id_from(playlist)
            )
        };

        let mut args = self.config.extra_args.clone();
        args.extend(["--flat-playlist".to_string(), "-j".to_string(), target]);
        args
    }

    fn line_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl VideoSearcher for YtDlpSearcher {
    fn name(&self) -> &str {
        "yt_dlp"
    }

    fn search(&self, request: &SearchRequest) -> CandidateStream {
        debug!(query = %request.query, max_results = request.max_results, "Starting yt-dlp search");

        output_lines(
            self.config.binary.clone(),
            self.search_args(request),
            self.line_timeout(),
        )
        .map(|line| line.and_then(|l| parse_record(&l)))
        .boxed()
    }

    async fn playlist_ids(&self, playlist: &str) -> Result<HashSet<String>, SearchError> {
        let mut lines = output_lines(
            self.config.binary.clone(),
            self.playlist_args(playlist),
            self.line_timeout(),
        );

        let mut ids = HashSet::new();
        while let Some(line) = lines.next().await {
            match parse_flat_entry(&line?) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => warn!(playlist = %playlist, error = %e, "Skipping playlist entry"),
            }
        }

        debug!(playlist = %playlist, count = ids.len(), "Playlist listing complete");
        Ok(ids)
    }
}

/// Lifecycle of the child process behind a line stream.
enum ProcessState {
    Pending {
        binary: PathBuf,
        args: Vec<String>,
        line_timeout: Duration,
    },
    Running {
        child: Child,
        lines: Lines<BufReader<ChildStdout>>,
        stderr: JoinHandle<String>,
        line_timeout: Duration,
    },
    Done,
}

/// Stream the non-empty stdout lines of a process.
///
/// Ends with an error item when the process can't be started, stalls, or
/// exits unsuccessfully.
fn output_lines(
    binary: PathBuf,
    args: Vec<String>,
    line_timeout: Duration,
) -> BoxStream<'static, Result<String, SearchError>> {
    let initial = ProcessState::Pending {
        binary,
        args,
        line_timeout,
    };

    stream::unfold(initial, |mut state| async move {
        loop {
            match state {
                ProcessState::Pending {
                    binary,
                    args,
                    line_timeout,
                } => match spawn(&binary, &args) {
                    Ok((child, lines, stderr)) => {
                        state = ProcessState::Running {
                            child,
                            lines,
                            stderr,
                            line_timeout,
                        };
                    }
                    Err(e) => return Some((Err(e), ProcessState::Done)),
                },
                ProcessState::Running {
                    mut child,
                    mut lines,
                    stderr,
                    line_timeout,
                } => match timeout(line_timeout, lines.next_line()).await {
                    Ok(Ok(Some(line))) => {
                        let next = ProcessState::Running {
                            child,
                            lines,
                            stderr,
                            line_timeout,
                        };
                        if line.trim().is_empty() {
                            state = next;
                            continue;
                        }
                        return Some((Ok(line), next));
                    }
                    Ok(Ok(None)) => {
                        return match finish(child, stderr).await {
                            Ok(()) => None,
                            Err(e) => Some((Err(e), ProcessState::Done)),
                        };
                    }
                    Ok(Err(e)) => {
                        let _ = child.start_kill();
                        return Some((
                            Err(SearchError::Api(format!("Failed to read yt-dlp output: {}", e))),
                            ProcessState::Done,
                        ));
                    }
                    Err(_) => {
                        let _ = child.start_kill();
                        return Some((Err(SearchError::Timeout), ProcessState::Done));
                    }
                },
                ProcessState::Done => return None,
            }
        }
    })
    .boxed()
}

type Spawned = (Child, Lines<BufReader<ChildStdout>>, JoinHandle<String>);

fn spawn(binary: &Path, args: &[String]) -> Result<Spawned, SearchError> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SearchError::Unavailable(format!("{} not found", binary.display()))
            } else {
                SearchError::Unavailable(format!("Failed to start {}: {}", binary.display(), e))
            }
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SearchError::Unavailable("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SearchError::Unavailable("stderr was not captured".to_string()))?;

    // Drain stderr concurrently so a chatty process can't block on a full pipe.
    let stderr_task = tokio::spawn(async move {
        let mut output = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut output).await;
        output
    });

    Ok((child, BufReader::new(stdout).lines(), stderr_task))
}

async fn finish(mut child: Child, stderr: JoinHandle<String>) -> Result<(), SearchError> {
    let status = child
        .wait()
        .await
        .map_err(|e| SearchError::Api(format!("Failed to wait for yt-dlp: {}", e)))?;
    let stderr = stderr.await.unwrap_or_default();

    if status.success() {
        Ok(())
    } else {
        Err(classify_failure(status.code(), &stderr))
    }
}

/// Map an unsuccessful exit to a search error using yt-dlp's stderr.
fn classify_failure(code: Option<i32>, stderr: &str) -> SearchError {
    let lowered = stderr.to_lowercase();
    let summary = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .unwrap_or("no error output")
        .trim()
        .to_string();

    if lowered.contains("http error 429")
        || lowered.contains("too many requests")
        || lowered.contains("rate limit")
        || lowered.contains("rate-limit")
    {
        SearchError::QuotaExceeded(summary)
    } else {
        let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        SearchError::Api(format!("yt-dlp exited with {}: {}", code, summary))
    }
}

/// Parse one `yt-dlp -j` output line.
fn parse_record(line: &str) -> Result<VideoCandidate, SearchError> {
    let record: YtDlpRecord = serde_json::from_str(line)
        .map_err(|e| SearchError::MalformedRecord(format!("invalid JSON: {}", e)))?;

    let video_id = record
        .display_id
        .or(record.id)
        .ok_or_else(|| SearchError::MalformedRecord("record without id".to_string()))?;

    let title = record.title.ok_or_else(|| {
        SearchError::MalformedRecord(format!("record {} without title", video_id))
    })?;

    let published_at = record
        .upload_date
        .as_deref()
        .and_then(parse_upload_date)
        .or_else(|| record.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0)))
        .ok_or_else(|| {
            SearchError::MalformedRecord(format!("record {} without upload date", video_id))
        })?;

    let url = record
        .original_url
        .or(record.webpage_url)
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video_id));

    Ok(VideoCandidate {
        title,
        description: record.description.filter(|d| !d.is_empty()),
        uploader: record.uploader.or(record.channel).unwrap_or_default(),
        published_at,
        url,
        video_id,
    })
}

/// Parse one `--flat-playlist -j` output line into a video id.
fn parse_flat_entry(line: &str) -> Result<String, SearchError> {
    let entry: FlatEntry = serde_json::from_str(line)
        .map_err(|e| SearchError::MalformedRecord(format!("invalid JSON: {}", e)))?;

    entry
        .display_id
        .or(entry.id)
        .ok_or_else(|| SearchError::MalformedRecord("playlist entry without id".to_string()))
}

/// `upload_date` is `YYYYMMDD`.
fn parse_upload_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Deserialize)]
struct YtDlpRecord {
    id: Option<String>,
    display_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    upload_date: Option<String>,
    timestamp: Option<i64>,
    webpage_url: Option<String>,
    original_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    display_id: Option<String>,
}
