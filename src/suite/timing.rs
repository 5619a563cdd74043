//! Timing records and the shared append-only timing log
//!
//! One line per executed case: `<input-path> <elapsed-seconds>`. The log is
//! opened in append mode for every record and never truncated, so repeated
//! suite runs accumulate. Concurrent writers are not coordinated.

use crate::{Error, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Elapsed wall-clock time of one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingRecord {
    /// Case identity as written to the log
    pub case: String,
    /// Whole seconds, rounded down
    pub elapsed_secs: u64,
}

impl TimingRecord {
    pub fn new(case: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            case: case.into(),
            elapsed_secs: elapsed.as_secs(),
        }
    }

    /// Log line without trailing newline
    pub fn to_line(&self) -> String {
        format!("{} {}", self.case, self.elapsed_secs)
    }

    /// Parse a log line; the last space separates the seconds
    pub fn parse_line(line: &str) -> Option<Self> {
        let (case, secs) = line.trim_end().rsplit_once(' ')?;
        if case.is_empty() {
            return None;
        }
        Some(Self {
            case: case.to_string(),
            elapsed_secs: secs.parse().ok()?,
        })
    }
}

/// Append-only timing log file
#[derive(Debug, Clone)]
pub struct TimingLog {
    path: PathBuf,
}

impl TimingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, creating the file and its parent directory if needed
    pub fn append(&self, record: &TimingRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(format!("opening {}", self.path.display()), e))?;
        writeln!(file, "{}", record.to_line())
            .map_err(|e| Error::io(format!("appending to {}", self.path.display()), e))
    }

    /// All well-formed records in file order; a missing log reads as empty
    pub fn read_records(&self) -> Result<Vec<TimingRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(format!("reading {}", self.path.display()), e)),
        };
        Ok(text.lines().filter_map(TimingRecord::parse_line).collect())
    }
}

/// Monotonic time source for case timing
pub trait Clock {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
