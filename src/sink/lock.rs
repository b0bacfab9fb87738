//! Exclusive advisory lock on a sidecar `.lock` file, shared by every process
//! that writes the same log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

pub(crate) struct LockFile {
    file: File,
    path: PathBuf,
}

/// Held for the duration of one write; releases the lock on drop
pub(crate) struct LockGuard {
    #[cfg(unix)]
    _flock: Flock<File>,
}

impl LockFile {
    pub(crate) fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self { file, path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Block until this process holds the lock exclusively.
    ///
    /// The guard locks a dup of our descriptor, so the lock belongs to our
    /// open file description and is released when the guard drops.
    #[cfg(unix)]
    pub(crate) fn lock(&self) -> io::Result<LockGuard> {
        loop {
            let handle = self.file.try_clone()?;
            match Flock::lock(handle, FlockArg::LockExclusive) {
                Ok(flock) => return Ok(LockGuard { _flock: flock }),
                Err((_, Errno::EINTR)) => continue,
                Err((_, errno)) => return Err(io::Error::from(errno)),
            }
        }
    }

    /// Without flock only the in-process mutex serializes writers
    #[cfg(not(unix))]
    pub(crate) fn lock(&self) -> io::Result<LockGuard> {
        Ok(LockGuard {})
    }
}
