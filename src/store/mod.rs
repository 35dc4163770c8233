use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::ledger::IssuanceLedger;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("state file {0} not found (run `mintgate init` first)")]
    Missing(PathBuf),
    #[error("state file i/o")]
    Io(#[from] std::io::Error),
    #[error("state file is not a valid ledger")]
    Json(#[from] serde_json::Error),
}

/// JSON file holding the ledger between calls.
///
/// Writes go to a uniquely named temp file in the same directory that is then
/// renamed over the target, so readers only ever see a complete ledger.
#[derive(Clone, Debug)]
pub struct StateFile {
    path: PathBuf,
}

/// Exclusive advisory lock on a state file, held until dropped.
///
/// The lock lives on a `<state>.lock` sidecar because the state file itself is
/// replaced by rename on every save.
#[derive(Debug)]
pub struct StateLock {
    file: File,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until this process holds the state file exclusively.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        self.ensure_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(StateLock { file })
    }

    pub fn load(&self) -> Result<IssuanceLedger, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write a fresh ledger, refusing to clobber an existing one unless
    /// `overwrite` is set.
    pub fn create(&self, ledger: &IssuanceLedger, overwrite: bool) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        if self.path.exists() && !overwrite {
            return Err(StoreError::AlreadyExists(self.path.clone()));
        }
        self.save(ledger)
    }

    /// Callers mutating existing state must hold [`StateFile::lock`] across
    /// their load and save.
    pub fn save(&self, ledger: &IssuanceLedger) -> Result<(), StoreError> {
        let dir = self.ensure_parent()?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(ledger)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(path = %self.path.display(), "ledger state saved");
        Ok(())
    }

    fn ensure_parent(&self) -> Result<PathBuf, StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
