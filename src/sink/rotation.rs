//! Rotation policies and the pure rollover decisions behind them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::EventlogError;

/// When a rotating sink moves its current file aside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Roll over when the wall clock leaves the file's interval bucket
    Time { when: RotationInterval },
    /// Roll over before a write would push the file past `max_bytes` (0 = never)
    Size { max_bytes: u64 },
}

impl Default for RotationPolicy {
    fn default() -> Self {
        RotationPolicy::Time {
            when: RotationInterval::Midnight,
        }
    }
}

impl RotationPolicy {
    /// Size policy: rotate if a non-empty file would exceed the limit
    pub fn size_rollover(max_bytes: u64, current_len: u64, incoming: u64) -> bool {
        max_bytes > 0 && current_len > 0 && current_len + incoming > max_bytes
    }
}

/// Time bucket granularity for time-based rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationInterval {
    Second,
    Minute,
    Hour,
    #[default]
    Midnight,
}

impl RotationInterval {
    /// strftime format of the backup suffix; also identifies the bucket
    pub fn suffix_format(self) -> &'static str {
        match self {
            RotationInterval::Second => "%Y-%m-%d_%H-%M-%S",
            RotationInterval::Minute => "%Y-%m-%d_%H-%M",
            RotationInterval::Hour => "%Y-%m-%d_%H",
            RotationInterval::Midnight => "%Y-%m-%d",
        }
    }

    pub fn bucket(self, at: DateTime<Local>) -> String {
        at.format(self.suffix_format()).to_string()
    }

    /// Backup suffix if a file last written at `modified` belongs to an
    /// earlier bucket than `now`
    pub fn rollover(self, modified: DateTime<Local>, now: DateTime<Local>) -> Option<String> {
        let old = self.bucket(modified);
        // Suffix formats sort chronologically as strings
        (old < self.bucket(now)).then_some(old)
    }
}

impl FromStr for RotationInterval {
    type Err = EventlogError;

    /// Accepts names (`minute`) and the classic single-letter codes (`M`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S" | "s" | "second" => Ok(RotationInterval::Second),
            "M" | "m" | "minute" => Ok(RotationInterval::Minute),
            "H" | "h" | "hour" => Ok(RotationInterval::Hour),
            "D" | "d" | "day" | "midnight" => Ok(RotationInterval::Midnight),
            other => Err(EventlogError::Config(format!(
                "unknown rotation interval '{other}' (expected second, minute, hour or midnight)"
            ))),
        }
    }
}

impl fmt::Display for RotationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationInterval::Second => "second",
            RotationInterval::Minute => "minute",
            RotationInterval::Hour => "hour",
            RotationInterval::Midnight => "midnight",
        };
        f.write_str(name)
    }
}
