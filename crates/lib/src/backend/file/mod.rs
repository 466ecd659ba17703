//! Durable backend over a data directory.
//!
//! Layout:
//!
//! ```text
//! <data_dir>/
//!   .lock             exclusive process lock
//!   groups.json       group registry
//!   users/<uid>.json  one document per user
//! ```
//!
//! Every write goes to a temporary file in the target directory, is synced,
//! atomically renamed over the target and followed by a directory sync. A
//! crash therefore leaves either the old or the new document, never a
//! partial one.

mod lock;

use std::{
    any::Any,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub use lock::DataDirLock;

use super::{Backend, BackendError, LoadedRecord, codec};
use crate::{
    Result,
    constants::{GROUPS_FILE, RECORD_EXTENSION, USERS_DIR},
    group::Group,
    user::{Uid, UserRecord},
};

#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    users_dir: PathBuf,
    _lock: DataDirLock,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> BackendError + '_ {
    move |source| BackendError::FileIo {
        path: path.to_path_buf(),
        source,
    }
}

impl FileBackend {
    /// Open (creating if needed) a data directory and lock it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        let lock = DataDirLock::acquire(&root)?;
        let users_dir = root.join(USERS_DIR);
        fs::create_dir_all(&users_dir).map_err(io_err(&users_dir))?;
        info!(path = %root.display(), "opened data directory");
        Ok(Self {
            root,
            users_dir,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of the document holding `uid`.
    pub fn record_path(&self, uid: Uid) -> PathBuf {
        self.users_dir.join(format!("{uid}.{RECORD_EXTENSION}"))
    }

    pub fn groups_path(&self) -> PathBuf {
        self.root.join(GROUPS_FILE)
    }

    fn load_one(&self, path: &Path) -> Option<LoadedRecord> {
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            debug!(path = %path.display(), "ignoring non-record file");
            return None;
        }
        let location = path.display().to_string();
        let stem_uid = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<Uid>().ok());

        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                return Some(LoadedRecord::Corrupt {
                    uid: stem_uid,
                    location,
                    reason: format!("unreadable: {e}"),
                });
            }
        };

        let Some(uid) = stem_uid else {
            return Some(LoadedRecord::Corrupt {
                uid: codec::peek_uid(&json),
                location,
                reason: "file name is not a uid".to_string(),
            });
        };

        Some(match codec::decode_record(&json) {
            Ok(record) if record.uid == uid => LoadedRecord::Valid(record),
            Ok(record) => LoadedRecord::Corrupt {
                uid: Some(uid),
                location,
                reason: format!("document claims uid {}", record.uid),
            },
            Err(reason) => LoadedRecord::Corrupt {
                uid: Some(uid),
                location,
                reason,
            },
        })
    }
}

/// Replace `target` with `contents` via a synced temporary file in `dir`.
fn write_atomic(dir: &Path, target: &Path, contents: &str) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    tmp.write_all(contents.as_bytes()).map_err(io_err(tmp.path()))?;
    tmp.as_file().sync_all().map_err(io_err(target))?;
    tmp.persist(target).map_err(|e| io_err(target)(e.error))?;
    sync_dir(dir)
}

fn sync_dir(dir: &Path) -> Result<()> {
    #[cfg(unix)]
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(io_err(dir))?;
    #[cfg(not(unix))]
    let _ = dir;
    Ok(())
}

impl Backend for FileBackend {
    fn load_users(&self) -> Result<Vec<LoadedRecord>> {
        let entries = fs::read_dir(&self.users_dir).map_err(io_err(&self.users_dir))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err(&self.users_dir))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let loaded: Vec<LoadedRecord> = paths.iter().filter_map(|p| self.load_one(p)).collect();
        let corrupt = loaded
            .iter()
            .filter(|r| matches!(r, LoadedRecord::Corrupt { .. }))
            .count();
        if corrupt > 0 {
            warn!(corrupt, path = %self.users_dir.display(), "some user records could not be decoded");
        }
        Ok(loaded)
    }

    fn save_user(&self, record: &UserRecord) -> Result<()> {
        let json = codec::encode_record(record)?;
        write_atomic(&self.users_dir, &self.record_path(record.uid), &json)
    }

    fn remove_user(&self, uid: Uid) -> Result<()> {
        let path = self.record_path(uid);
        match fs::remove_file(&path) {
            Ok(()) => sync_dir(&self.users_dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e).into()),
        }
    }

    fn load_groups(&self) -> Result<Option<Vec<Group>>> {
        let path = self.groups_path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e).into()),
        };
        codec::decode_groups(&json).map(Some).map_err(|reason| {
            BackendError::CorruptRecord {
                uid: None,
                location: path.display().to_string(),
                reason,
            }
            .into()
        })
    }

    fn save_groups(&self, groups: &[Group]) -> Result<()> {
        let json = codec::encode_groups(groups)?;
        write_atomic(&self.root, &self.groups_path(), &json)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
