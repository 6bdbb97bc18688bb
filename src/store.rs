//! Durable snapshot of the two job lists.
//!
//! One JSON file holds two named records, `videosdgx_jobs` (active) and
//! `videosdgx_completed`. Loading never fails: a missing file, an unreadable
//! file or a record that does not decode all come back as empty lists.
//!
//! Several processes may share one store (a `watch` loop and one-shot
//! `submit`/`remove` commands). Writers take an exclusive lock on a sibling
//! `<name>.lock` file for the whole read-modify-write; readers need no lock
//! since the data file is only ever replaced by rename.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::jobs::{Job, JobSets};

pub const ACTIVE_RECORD: &str = "videosdgx_jobs";
pub const COMPLETED_RECORD: &str = "videosdgx_completed";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    #[serde(rename = "videosdgx_jobs")]
    active: &'a [Job],
    #[serde(rename = "videosdgx_completed")]
    completed: &'a [Job],
}

// Records stay as raw values so each one decodes on its own.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(rename = "videosdgx_jobs", default)]
    active: Option<serde_json::Value>,
    #[serde(rename = "videosdgx_completed", default)]
    completed: Option<serde_json::Value>,
}

/// File-backed store for [`JobSets`].
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
}

/// Exclusive cross-process lock on a store, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until this process is the only writer of the store.
    pub fn lock(&self) -> Result<StoreLock, StoreError> {
        self.create_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.sibling("lock"))?;
        file.lock_exclusive()?;
        Ok(StoreLock { file })
    }

    /// Read both lists, falling back to empty ones on any problem.
    pub fn load(&self) -> JobSets {
        match self.read() {
            Ok(sets) => sets,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable job store");
                JobSets::default()
            }
        }
    }

    fn read(&self) -> Result<JobSets, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(JobSets::default()),
            Err(e) => return Err(e.into()),
        };
        let raw: RawSnapshot = serde_json::from_str(&contents)?;
        Ok(JobSets::from_parts(
            decode_record(ACTIVE_RECORD, raw.active),
            decode_record(COMPLETED_RECORD, raw.completed),
        ))
    }

    /// Write both lists. The file is replaced through a rename so a crash
    /// mid-write leaves the previous snapshot intact. Callers sharing the
    /// store with other processes hold [`JobStore::lock`] around the write.
    pub fn save(&self, sets: &JobSets) -> Result<(), StoreError> {
        let snapshot = SnapshotRef {
            active: sets.active(),
            completed: sets.completed(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        self.create_parent()?;
        let tmp = self.sibling("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn create_parent(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }

    // `jobs.json` -> `jobs.json.<ext>`
    fn sibling(&self, ext: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(ext);
        self.path.with_file_name(name)
    }
}

fn decode_record(name: &str, value: Option<serde_json::Value>) -> Vec<Job> {
    let Some(value) = value else {
        return Vec::new();
    };
    if value.is_null() {
        return Vec::new();
    }
    match serde_json::from_value(value) {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!(record = name, error = %e, "discarding corrupt job record");
            Vec::new()
        }
    }
}
