//! Advisory locks guarding cache entries.
//!
//! A location is locked through a sibling `{location}.lock` file. Lock files
//! are deleted on release, so a waiter may end up holding a lock on a file
//! that has since been unlinked; such a lock is stale and acquisition starts
//! over.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{FetchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers
    Shared,
    /// One writer, no readers
    Exclusive,
}

/// Lock file used for `location`
pub fn lock_path_for(location: &Path) -> PathBuf {
    let mut path = location.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// A held lock, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: Option<File>,
    lock_path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    /// Block until `location` is locked in `mode`
    pub fn acquire(location: &Path, mode: LockMode) -> Result<Self> {
        let lock_path = lock_path_for(location);
        let lock_error = |source: io::Error| FetchError::Lock {
            path: lock_path.clone(),
            source,
        };

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(lock_error)?;
        }

        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(lock_error)?;

            match mode {
                LockMode::Shared => FileExt::lock_shared(&file),
                LockMode::Exclusive => FileExt::lock_exclusive(&file),
            }
            .map_err(lock_error)?;

            if is_live(&file, &lock_path) {
                log::trace!("Locked {} ({:?})", lock_path.display(), mode);
                return Ok(Self {
                    file: Some(file),
                    lock_path,
                    mode,
                });
            }

            log::debug!("Lock file {} was replaced while waiting, retrying", lock_path.display());
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Release now instead of on drop
    pub fn release(mut self) -> Result<()> {
        self.release_inner().map_err(|source| FetchError::Lock {
            path: self.lock_path.clone(),
            source,
        })
    }

    fn release_inner(&mut self) -> io::Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        let remove = match self.mode {
            // only the last reader cleans up
            LockMode::Shared => {
                FileExt::try_lock_exclusive(&file).is_ok() && is_live(&file, &self.lock_path)
            }
            LockMode::Exclusive => true,
        };

        let removed = if remove {
            match fs::remove_file(&self.lock_path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        } else {
            Ok(())
        };

        FileExt::unlock(&file)?;
        removed
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            log::warn!("Failed to release lock {}: {}", self.lock_path.display(), e);
        }
    }
}

/// Whether `file` is still the file at `lock_path`
#[cfg(unix)]
fn is_live(file: &File, lock_path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(lock_path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_live(_file: &File, lock_path: &Path) -> bool {
    lock_path.exists()
}

/// Run `f` while `location` is locked in `mode`
pub fn with_lock<T, F>(location: &Path, mode: LockMode, f: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let lock = FileLock::acquire(location, mode)?;
    let result = f(location);
    lock.release()?;
    result
}
