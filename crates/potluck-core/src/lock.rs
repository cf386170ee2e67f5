//! Advisory lock on the sidecar `<store>.lock` file.
//!
//! Several `potluck` processes may touch one store file (an interactive
//! command next to a running `watch`). Reads take a shared lock, every
//! read-modify-write takes an exclusive one. The lock lives on a separate
//! file because the store itself is replaced by rename on every write.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::trace;

use crate::error::StoreError;

/// Pause between attempts while another process holds the lock.
const RETRY_EVERY: Duration = Duration::from_millis(10);

/// A held lock on the store's lock file. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
    exclusive: bool,
}

impl StoreLock {
    /// Lock for reading. Readers do not block each other.
    ///
    /// # Errors
    ///
    /// [`StoreError::LockTimeout`] if a writer keeps the lock past
    /// `timeout`, [`StoreError::Io`] if the lock file cannot be opened.
    pub fn shared(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        Self::wait_for(path, timeout, false)
    }

    /// Lock for a read-modify-write.
    ///
    /// # Errors
    ///
    /// As for [`StoreLock::shared`], but any other holder blocks.
    pub fn exclusive(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        Self::wait_for(path, timeout, true)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn wait_for(path: &Path, timeout: Duration, exclusive: bool) -> Result<Self, StoreError> {
        let file = open_lock_file(path)?;
        let deadline = Instant::now() + timeout;
        let mut attempts = 0u32;
        loop {
            let taken = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            if taken.is_ok() {
                trace!(path = %path.display(), exclusive, attempts, "store lock taken");
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    exclusive,
                });
            }
            if Instant::now() >= deadline {
                return Err(StoreError::LockTimeout {
                    path: path.to_path_buf(),
                    waited: timeout,
                });
            }
            attempts += 1;
            thread::sleep(RETRY_EVERY);
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> Result<File, StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(io_error)
}
