//! Follows a growing access log and yields its complete lines in order.
//!
//! The tailer polls the file size instead of relying on filesystem
//! notifications, so it works the same on bind mounts and shared volumes.
//! A truncated file (copy-truncate rotation) is re-read from the start.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Delay between existence checks while the log file is missing.
pub const FILE_WAIT_INTERVAL: Duration = Duration::from_secs(2);

/// Back-off after a failed read.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Bytes read from the file per poll at most.
pub const READ_CHUNK_BYTES: u64 = 256 * 1024;

/// Longest line kept. Anything longer is dropped up to its newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines, holding back an unterminated tail.
#[derive(Debug)]
pub struct LineBuffer {
    partial: Vec<u8>,
    max_line: usize,
    /// Inside an overlong line; skip until the next newline.
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            partial: Vec::new(),
            max_line: max_line.max(1),
            discarding: false,
        }
    }

    /// Append `bytes` and return every line completed by them, without the
    /// terminating `\n` or `\r\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let head = &rest[..pos];
            rest = &rest[pos + 1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }
            self.partial.extend_from_slice(head);
            if self.partial.len() > self.max_line {
                self.drop_overlong();
                continue;
            }

            let line = match self.partial.last() {
                Some(b'\r') => &self.partial[..self.partial.len() - 1],
                _ => &self.partial[..],
            };
            lines.push(String::from_utf8_lossy(line).into_owned());
            self.partial.clear();
        }

        if !self.discarding {
            self.partial.extend_from_slice(rest);
            if self.partial.len() > self.max_line {
                self.drop_overlong();
                self.discarding = true;
            }
        }
        lines
    }

    fn drop_overlong(&mut self) {
        warn!(
            dropped_bytes = self.partial.len(),
            max_line_bytes = self.max_line,
            "log line too long, discarding"
        );
        self.partial.clear();
    }

    /// Bytes waiting for their newline.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    pub fn clear(&mut self) {
        self.partial.clear();
        self.discarding = false;
    }
}

/// Polling reader for one log file.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    poll_interval: Duration,
    offset: u64,
    /// Set until the first successful poll when existing content is skipped.
    skip_existing: bool,
    chunk_size: u64,
    /// The last poll stopped short of the end of the file.
    backlog: bool,
    buffer: LineBuffer,
}

impl LogTailer {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, read_from_start: bool) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            offset: 0,
            skip_existing: !read_from_start,
            chunk_size: READ_CHUNK_BYTES,
            backlog: false,
            buffer: LineBuffer::new(),
        }
    }

    /// Cap the bytes read per poll.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset up to which the file has been consumed.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether unread bytes remained after the last poll.
    pub fn has_backlog(&self) -> bool {
        self.backlog
    }

    /// Read up to one chunk of what was appended since the last poll.
    pub async fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let len = tokio::fs::metadata(&self.path).await?.len();
        self.backlog = false;

        if self.skip_existing {
            self.skip_existing = false;
            self.offset = len;
            debug!(path = %self.path.display(), offset = len, "skipping existing log content");
            return Ok(Vec::new());
        }

        if len < self.offset {
            warn!(
                path = %self.path.display(),
                previous = self.offset,
                current = len,
                "log file shrank, reading from the start"
            );
            self.offset = 0;
            self.buffer.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let want = (len - self.offset).min(self.chunk_size);
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut bytes = Vec::with_capacity(want as usize);
        file.take(want).read_to_end(&mut bytes).await?;

        self.offset += bytes.len() as u64;
        self.backlog = self.offset < len;
        Ok(self.buffer.push(&bytes))
    }

    /// Wait until the file exists. Returns `false` when shutdown came first.
    pub async fn wait_for_file(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut announced = false;
        loop {
            if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
                if announced {
                    info!(path = %self.path.display(), "log file appeared");
                }
                return true;
            }
            if !announced {
                info!(path = %self.path.display(), "waiting for log file to appear");
                announced = true;
            }
            tokio::select! {
                _ = tokio::time::sleep(FILE_WAIT_INTERVAL) => {}
                _ = shutdown.changed() => return false,
            }
        }
    }

    /// Forward lines to `lines` until shutdown or until the receiver is gone.
    pub async fn run(mut self, lines: mpsc::Sender<String>, mut shutdown: watch::Receiver<bool>) {
        if !self.wait_for_file(&mut shutdown).await {
            info!("tailer stopped before the log file appeared");
            return;
        }
        info!(
            path = %self.path.display(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "tailing log file"
        );

        loop {
            let delay = match self.poll().await {
                Ok(batch) => {
                    if !batch.is_empty() {
                        debug!(lines = batch.len(), offset = self.offset, "read new lines");
                    }
                    for line in batch {
                        if lines.send(line).await.is_err() {
                            warn!("line consumer went away, tailer exiting");
                            return;
                        }
                    }
                    if self.backlog {
                        Duration::ZERO
                    } else {
                        self.poll_interval
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %self.path.display(),
                        retry_secs = RETRY_BACKOFF.as_secs(),
                        "failed to read log file"
                    );
                    RETRY_BACKOFF
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("tailer shutting down");
                    break;
                }
            }
        }
    }
}
