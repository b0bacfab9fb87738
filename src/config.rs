//! Sink configuration: where the two files live and how they rotate
//!
//! Sources, lowest to highest precedence:
//! - `EventlogConfig::default()`
//! - YAML file (`from_yaml_file`), missing keys keep their defaults
//! - environment, applied on top of either of the above (`from_env`): `APP_HOME`, `EVENTLOG_DIR`,
//!   `EVENTLOG_ROTATION`, `EVENTLOG_MAX_BYTES`, `EVENTLOG_BACKUP_COUNT`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EventlogError, Result};
use crate::sink::{RotationInterval, RotationPolicy};

pub const DEFAULT_EVENT_FILE: &str = "eventlog.log";
pub const DEFAULT_LAYOUT_FILE: &str = "eventlog.layout";

/// Size limit used when size rotation is requested without `EVENTLOG_MAX_BYTES`
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventlogConfig {
    /// Directory holding both files
    pub log_dir: PathBuf,
    pub event_file: String,
    pub layout_file: String,
    pub rotation: RotationPolicy,
    /// Rotated files to keep (0 = keep all for time rotation, truncate for size)
    pub backup_count: usize,
}

impl Default for EventlogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("."),
            event_file: DEFAULT_EVENT_FILE.to_string(),
            layout_file: DEFAULT_LAYOUT_FILE.to_string(),
            rotation: RotationPolicy::default(),
            backup_count: 0,
        }
    }
}

impl EventlogConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply environment overrides read through `var`
    pub fn with_env<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(home) = var("APP_HOME").filter(|h| !h.is_empty()) {
            self.log_dir = Path::new(&home).join("logs");
        }
        if let Some(dir) = var("EVENTLOG_DIR").filter(|d| !d.is_empty()) {
            self.log_dir = PathBuf::from(dir);
        }

        if let Some(rotation) = var("EVENTLOG_ROTATION") {
            self.rotation = match rotation.trim() {
                "size" => RotationPolicy::Size {
                    max_bytes: DEFAULT_MAX_BYTES,
                },
                when => RotationPolicy::Time {
                    when: when.parse::<RotationInterval>()?,
                },
            };
        }

        if let Some(max) = var("EVENTLOG_MAX_BYTES") {
            let max_bytes = parse_number::<u64>("EVENTLOG_MAX_BYTES", &max)?;
            match &mut self.rotation {
                RotationPolicy::Size { max_bytes: current } => *current = max_bytes,
                RotationPolicy::Time { .. } => {
                    tracing::warn!("EVENTLOG_MAX_BYTES ignored: rotation is time based");
                }
            }
        }

        if let Some(count) = var("EVENTLOG_BACKUP_COUNT") {
            self.backup_count = parse_number::<usize>("EVENTLOG_BACKUP_COUNT", &count)?;
        }

        Ok(self)
    }

    pub fn event_path(&self) -> PathBuf {
        self.log_dir.join(&self.event_file)
    }

    pub fn layout_path(&self) -> PathBuf {
        self.log_dir.join(&self.layout_file)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        EventlogError::Config(format!(
            "{key} must be a non-negative integer, got '{raw}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = EventlogConfig::default();
        assert_eq!(cfg.event_path(), PathBuf::from("./eventlog.log"));
        assert_eq!(cfg.layout_path(), PathBuf::from("./eventlog.layout"));
        assert_eq!(
            cfg.rotation,
            RotationPolicy::Time {
                when: RotationInterval::Midnight
            }
        );
        assert_eq!(cfg.backup_count, 0);
    }

    #[test]
    fn app_home_sets_logs_dir() {
        let cfg = EventlogConfig::default()
            .with_env(env(&[("APP_HOME", "/srv/app")]))
            .unwrap();
        assert_eq!(cfg.event_path(), PathBuf::from("/srv/app/logs/eventlog.log"));
    }

    #[test]
    fn eventlog_dir_wins_over_app_home() {
        let cfg = EventlogConfig::default()
            .with_env(env(&[("APP_HOME", "/srv/app"), ("EVENTLOG_DIR", "/tmp/ev")]))
            .unwrap();
        assert_eq!(cfg.log_dir, PathBuf::from("/tmp/ev"));
    }

    #[test]
    fn size_rotation_from_env() {
        let cfg = EventlogConfig::default()
            .with_env(env(&[
                ("EVENTLOG_ROTATION", "size"),
                ("EVENTLOG_MAX_BYTES", "5242880"),
                ("EVENTLOG_BACKUP_COUNT", "9"),
            ]))
            .unwrap();
        assert_eq!(cfg.rotation, RotationPolicy::Size { max_bytes: 5_242_880 });
        assert_eq!(cfg.backup_count, 9);
    }

    #[test]
    fn time_rotation_from_env_code() {
        let cfg = EventlogConfig::default()
            .with_env(env(&[("EVENTLOG_ROTATION", "M")]))
            .unwrap();
        assert_eq!(
            cfg.rotation,
            RotationPolicy::Time {
                when: RotationInterval::Minute
            }
        );
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let err = EventlogConfig::default()
            .with_env(env(&[("EVENTLOG_BACKUP_COUNT", "many")]))
            .unwrap_err();
        assert!(matches!(err, EventlogError::Config(_)));

        let err = EventlogConfig::default()
            .with_env(env(&[("EVENTLOG_ROTATION", "weekly")]))
            .unwrap_err();
        assert!(matches!(err, EventlogError::Config(_)));
    }

    #[test]
    fn env_applies_on_top_of_yaml() {
        let cfg = EventlogConfig::from_yaml_str("log_dir: /var/log/payments\nbackup_count: 3\n")
            .unwrap()
            .with_env(env(&[("EVENTLOG_BACKUP_COUNT", "7")]))
            .unwrap();
        assert_eq!(cfg.log_dir, PathBuf::from("/var/log/payments"));
        assert_eq!(cfg.backup_count, 7);
    }

    #[test]
    fn yaml_with_partial_keys() {
        let cfg = EventlogConfig::from_yaml_str(
            r#"
log_dir: /var/log/payments
rotation:
  kind: size
  max_bytes: 1024
backup_count: 3
"#,
        )
        .unwrap();

        assert_eq!(cfg.log_dir, PathBuf::from("/var/log/payments"));
        assert_eq!(cfg.event_file, DEFAULT_EVENT_FILE);
        assert_eq!(cfg.rotation, RotationPolicy::Size { max_bytes: 1024 });
        assert_eq!(cfg.backup_count, 3);
    }
}
