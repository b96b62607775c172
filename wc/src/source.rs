//! Line-oriented access to the source text file
//!
//! Lines are numbered from 1. A final line without a trailing newline still
//! counts, a trailing `\r` is dropped, and invalid UTF-8 is replaced rather
//! than rejected.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Errors from reading the source file
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to open source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read line {line} of {path}: {source}")]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Source {path} ended before line {line}")]
    UnexpectedEof { path: PathBuf, line: u64 },
}

/// Sequential reader that remembers which line comes next
pub struct SourceReader {
    path: PathBuf,
    reader: BufReader<File>,
    next_line: u64,
    buf: Vec<u8>,
}

impl SourceReader {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "open: called");
        let reader = Self::open_reader(&path).await?;
        Ok(Self {
            path,
            reader,
            next_line: 1,
            buf: Vec::new(),
        })
    }

    async fn open_reader(path: &Path) -> Result<BufReader<File>, SourceError> {
        let file = File::open(path).await.map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::with_capacity(READ_BUFFER_SIZE, file))
    }

    /// Number of the line the next `read_line` returns
    pub fn next_line_number(&self) -> u64 {
        self.next_line
    }

    /// Read the next line, `None` at end of input
    pub async fn read_line(&mut self) -> Result<Option<String>, SourceError> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|source| SourceError::Read {
                path: self.path.clone(),
                line: self.next_line,
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }

        let mut line = &self.buf[..];
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        self.next_line += 1;
        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }

    /// Read the next line, failing if input ends first
    pub async fn require_line(&mut self) -> Result<String, SourceError> {
        let line = self.next_line;
        self.read_line().await?.ok_or_else(|| SourceError::UnexpectedEof {
            path: self.path.clone(),
            line,
        })
    }

    /// Position the reader so the next line read is `line`
    ///
    /// Skips forward by discarding lines. A reader already past `line` is
    /// reopened and skips from the start.
    pub async fn seek_to_line(&mut self, line: u64) -> Result<(), SourceError> {
        debug!(line, next_line = self.next_line, "seek_to_line: called");
        if line < self.next_line {
            debug!(line, next_line = self.next_line, "seek_to_line: rewinding");
            self.reader = Self::open_reader(&self.path).await?;
            self.next_line = 1;
        }
        while self.next_line < line {
            self.require_line().await?;
        }
        Ok(())
    }
}
