//! Append-only file sink with time/size rotation, safe across processes
//!
//! Every write runs the same critical section under an in-process mutex and
//! an exclusive `flock` on `<file>.lock`:
//!
//! 1. reopen the file if another process rotated it away
//! 2. apply the rotation policy
//! 3. append the whole line with a single `write_all`
//!
//! So a line never straddles two backing files and concurrent writers never
//! interleave bytes.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use super::lock::LockFile;
use super::rotation::RotationPolicy;
use super::{timestamped, LineSink};

pub struct RotatingFileSink {
    path: PathBuf,
    policy: RotationPolicy,
    /// Rotated files to keep (0 = keep all for time, truncate for size)
    backup_count: usize,
    lock: LockFile,
    file: Mutex<File>,
}

enum Rollover {
    Timed(String),
    Sized,
}

impl RotatingFileSink {
    /// Open (or create) `path` for appending; parent directories are created
    pub fn open(
        path: impl Into<PathBuf>,
        policy: RotationPolicy,
        backup_count: usize,
    ) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = LockFile::open(with_suffix(&path, "lock"))?;
        let file = open_append(&path)?;

        tracing::debug!(path = %path.display(), ?policy, backup_count, "opened rotating sink");

        Ok(Self {
            path,
            policy,
            backup_count,
            lock,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    pub fn backup_count(&self) -> usize {
        self.backup_count
    }

    pub fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }

    /// Rotated backups currently on disk, oldest name first
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}.*",
            glob::Pattern::escape(&self.path.to_string_lossy())
        );
        let entries = glob::glob(&pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|p| p.as_path() != self.lock.path())
            .collect();
        backups.sort();
        Ok(backups)
    }

    fn reopen_if_moved(&self, file: &mut File) -> io::Result<()> {
        if !self.is_current(file)? {
            *file = open_append(&self.path)?;
        }
        Ok(())
    }

    #[cfg(unix)]
    fn is_current(&self, file: &File) -> io::Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let open = file.metadata()?;
        match fs::metadata(&self.path) {
            Ok(on_disk) => Ok(on_disk.dev() == open.dev() && on_disk.ino() == open.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// No inode to compare: reopen by path on every write
    #[cfg(not(unix))]
    fn is_current(&self, _file: &File) -> io::Result<bool> {
        Ok(false)
    }

    fn rollover(&self, meta: &Metadata, incoming: usize) -> io::Result<Option<Rollover>> {
        if meta.len() == 0 {
            return Ok(None);
        }

        match self.policy {
            RotationPolicy::Time { when } => {
                let modified: DateTime<Local> = meta.modified()?.into();
                Ok(when.rollover(modified, Local::now()).map(Rollover::Timed))
            }
            RotationPolicy::Size { max_bytes } => {
                let rotate = RotationPolicy::size_rollover(max_bytes, meta.len(), incoming as u64);
                Ok(rotate.then_some(Rollover::Sized))
            }
        }
    }

    fn rotate_timed(&self, suffix: &str) -> io::Result<()> {
        let mut target = with_suffix(&self.path, suffix);
        let mut n = 1;
        while target.exists() {
            target = with_suffix(&self.path, &format!("{suffix}.{n}"));
            n += 1;
        }

        fs::rename(&self.path, &target)?;
        tracing::info!(from = %self.path.display(), to = %target.display(), "rotated log file");

        if self.backup_count > 0 {
            self.prune_backups();
        }
        Ok(())
    }

    fn prune_backups(&self) {
        let backups = match self.backups() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot list backups");
                return;
            }
        };

        let excess = backups.len().saturating_sub(self.backup_count);
        for old in &backups[..excess] {
            if let Err(e) = fs::remove_file(old) {
                tracing::warn!(path = %old.display(), error = %e, "cannot remove old backup");
            }
        }
    }

    fn rotate_sized(&self) -> io::Result<()> {
        if self.backup_count == 0 {
            OpenOptions::new().write(true).truncate(true).open(&self.path)?;
            tracing::info!(path = %self.path.display(), "truncated log file");
            return Ok(());
        }

        for i in (1..self.backup_count).rev() {
            let src = with_suffix(&self.path, &i.to_string());
            if src.exists() {
                fs::rename(&src, with_suffix(&self.path, &(i + 1).to_string()))?;
            }
        }

        let first = with_suffix(&self.path, "1");
        fs::rename(&self.path, &first)?;
        tracing::info!(from = %self.path.display(), to = %first.display(), "rotated log file");
        Ok(())
    }
}

impl LineSink for RotatingFileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut record = timestamped(line);
        record.push('\n');

        let mut file = self.file.lock();
        let _guard = self.lock.lock()?;

        self.reopen_if_moved(&mut file)?;

        if let Some(rollover) = self.rollover(&file.metadata()?, record.len())? {
            match rollover {
                Rollover::Timed(suffix) => self.rotate_timed(&suffix)?,
                Rollover::Sized => self.rotate_sized()?,
            }
            *file = open_append(&self.path)?;
        }

        file.write_all(record.as_bytes())
    }
}

impl fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field("backup_count", &self.backup_count)
            .finish()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `eventlog.log` + `1` -> `eventlog.log.1`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
