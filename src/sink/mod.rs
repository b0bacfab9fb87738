//! Line sinks: where event and layout lines end up
//!
//! - `LineSink`: the narrow "write one line" contract
//! - `MemorySink`: in-memory stream (tests, embedding)
//! - `RotatingFileSink`: append-only file, rotated by time or size, safe
//!   across threads and OS processes

mod lock;
pub mod rotating;
pub mod rotation;

use std::io;

use parking_lot::Mutex;

pub use rotating::RotatingFileSink;
pub use rotation::{RotationInterval, RotationPolicy};

/// `asctime`-style prefix, e.g. `2026-10-18 14:03:07,512`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Append-only line writer.
///
/// Each call must land as one contiguous line (timestamp prefix + text +
/// newline) or not at all, even with concurrent writers.
pub trait LineSink: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

/// Prefix `message` with the current local timestamp (no trailing newline)
pub fn timestamped(message: &str) -> String {
    format!(
        "{} {}",
        chrono::Local::now().format(TIMESTAMP_FORMAT),
        message
    )
}

/// In-memory sink that keeps every timestamped line
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full lines, timestamp prefix included
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Lines with the timestamp prefix stripped
    pub fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .map(|l| strip_timestamp(l).to_string())
            .collect()
    }

    /// Everything written so far, newline-terminated, as a file would hold it
    pub fn contents(&self) -> String {
        self.lines.lock().iter().map(|l| format!("{l}\n")).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(timestamped(line));
        Ok(())
    }
}

/// Drop the `<date> <time> ` prefix written by `timestamped`
pub fn strip_timestamp(line: &str) -> &str {
    line.splitn(3, ' ').nth(2).unwrap_or("")
}
