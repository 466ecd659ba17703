//! Exclusive lock on a data directory.
//!
//! Held for the lifetime of a [`super::FileBackend`] so a second process
//! (or a second backend in the same process) cannot open the same directory.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tracing::{debug, error, info};

use crate::{Result, backend::BackendError, constants::LOCK_FILE};

/// An exclusive OS-level lock on a data directory, released on drop.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Lock `data_dir`, creating it if needed. Fails immediately if the
    /// directory is already locked.
    pub fn acquire(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let lock_path = data_dir.join(LOCK_FILE);

        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(|source| BackendError::FileIo {
                path: data_dir.to_path_buf(),
                source,
            })?;
            debug!(path = %data_dir.display(), "created data directory");
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| BackendError::FileIo {
                path: lock_path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(path = %lock_path.display(), "acquired data directory lock");
                Ok(Self {
                    file,
                    path: lock_path,
                })
            }
            Err(e) if is_contended(&e) => {
                error!(path = %data_dir.display(), "data directory is locked by another process");
                Err(BackendError::DirectoryLocked {
                    path: data_dir.to_path_buf(),
                }
                .into())
            }
            Err(source) => Err(BackendError::FileIo {
                path: lock_path,
                source,
            }
            .into()),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            error!(path = %self.path.display(), error = %e, "failed to release data directory lock");
        } else {
            info!(path = %self.path.display(), "released data directory lock");
        }
    }
}
