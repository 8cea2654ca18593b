//! Append-only event log.
//!
//! One JSON record per line. Records are never rewritten; the only way to
//! remove them is [`EventLog::truncate`], which empties the whole log.
//!
//! Reads never fail: an unreadable log is reported as empty and a warning is
//! logged, so a damaged file degrades to "no history" instead of stopping the
//! device.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::event::PressEvent;

/// Errors from persisted storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Persisted sequence of press records.
pub trait EventLog: Send {
    /// Append one record. `record` must not contain a newline.
    fn append(&mut self, record: &str) -> Result<(), StorageError>;

    /// Every non-empty record in file order.
    fn lines(&self) -> Vec<String>;

    /// Remove every record.
    fn truncate(&mut self) -> Result<(), StorageError>;

    /// The most recent record, if any.
    fn last_line(&self) -> Option<String> {
        self.lines().pop()
    }

    /// Press counter recovered from the most recent record.
    ///
    /// Zero when the log is empty or its last record cannot be parsed.
    fn restore_count(&self) -> u64 {
        let Some(line) = self.last_line() else {
            return 0;
        };
        match PressEvent::from_json(&line) {
            Ok(event) => event.count(),
            Err(e) => {
                warn!("Unreadable last log record, counter starts at 0: {}", e);
                0
            }
        }
    }
}

impl<T: EventLog + ?Sized> EventLog for Box<T> {
    fn append(&mut self, record: &str) -> Result<(), StorageError> {
        (**self).append(record)
    }

    fn lines(&self) -> Vec<String> {
        (**self).lines()
    }

    fn truncate(&mut self) -> Result<(), StorageError> {
        (**self).truncate()
    }

    fn last_line(&self) -> Option<String> {
        (**self).last_line()
    }
}

/// Event log stored in a flat file (SPIFFS on the device).
#[derive(Debug, Clone)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_reading(&self) -> Option<File> {
        match File::open(&self.path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Failed to open {} for reading: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl EventLog for FileEventLog {
    fn append(&mut self, record: &str) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        writeln!(file, "{}", record).map_err(|e| StorageError::io(&self.path, e))?;
        file.flush().map_err(|e| StorageError::io(&self.path, e))
    }

    fn lines(&self) -> Vec<String> {
        let Some(file) = self.open_for_reading() else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            match line {
                Ok(line) => {
                    let line = line.trim_end_matches('\r');
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                Err(e) => {
                    warn!("Read error in {}: {}", self.path.display(), e);
                    break;
                }
            }
        }
        lines
    }

    fn truncate(&mut self) -> Result<(), StorageError> {
        File::create(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        debug!("Truncated {}", self.path.display());
        Ok(())
    }
}

/// Event log held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    lines: Vec<String>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records, as if read back after a restart.
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl EventLog for MemoryEventLog {
    fn append(&mut self, record: &str) -> Result<(), StorageError> {
        self.lines.push(record.to_string());
        Ok(())
    }

    fn lines(&self) -> Vec<String> {
        self.lines.iter().filter(|l| !l.is_empty()).cloned().collect()
    }

    fn truncate(&mut self) -> Result<(), StorageError> {
        self.lines.clear();
        Ok(())
    }
}
