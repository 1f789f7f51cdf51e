// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State store persistence.
//!
//! The store is a zstd-compressed JSON snapshot with an explicit schema
//! version, written atomically (temp file + rename). A sibling `.lock`
//! file holds an exclusive advisory lock for the lifetime of the open
//! store, serializing concurrent scheduler invocations. A missing state
//! file loads as the empty table.

use fs2::FileExt;
use nq_core::{StateRow, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current state file schema version.
pub const CURRENT_STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization error: {0}")]
    Encode(serde_json::Error),
    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported state file version {found}")]
    Version { found: u32 },
    #[error("state store {path} is locked by another scheduler process")]
    Locked { path: PathBuf },
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    #[serde(rename = "v")]
    version: u32,
    rows: Vec<StateRow>,
}

/// The persisted table of every task ever submitted.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    rows: Vec<StateRow>,
    /// Held until drop; the lock file itself stays in place.
    _lock: File,
}

impl StateStore {
    /// Open the store at `path`, taking the advisory lock.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        lock.try_lock_exclusive().map_err(|_| StoreError::Locked {
            path: path.to_path_buf(),
        })?;

        let rows = match fs::read(path) {
            Ok(bytes) => decode(&bytes, path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), rows = rows.len(), "opened state store");

        Ok(Self {
            path: path.to_path_buf(),
            rows,
            _lock: lock,
        })
    }

    pub fn rows(&self) -> &[StateRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&StateRow> {
        self.rows.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a freshly submitted row.
    pub fn push(&mut self, row: StateRow) {
        self.rows.push(row);
    }

    /// Indexes of all in-flight rows, in store order.
    pub fn in_flight(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.status.is_in_flight())
            .map(|(index, _)| index)
            .collect()
    }

    /// True when an in-flight row exists for the task coordinates.
    pub fn has_in_flight(&self, subject: &str, session: &str, procedure: &str) -> bool {
        self.rows
            .iter()
            .any(|row| row.status.is_in_flight() && row.matches(subject, session, procedure))
    }

    /// Set a row's status, returning the previous status.
    pub fn set_status(&mut self, index: usize, status: TaskStatus) -> Option<TaskStatus> {
        let row = self.rows.get_mut(index)?;
        let old = row.status;
        row.status = status;
        Some(old)
    }

    /// Remove `failed` rows matching the optional filters.
    ///
    /// Returns the removed rows so callers can audit each one. Rows in
    /// any other status are never touched.
    pub fn take_failed(&mut self, procedure: Option<&str>, subject: Option<&str>) -> Vec<StateRow> {
        let mut removed = Vec::new();
        self.rows.retain(|row| {
            let clear = row.status == TaskStatus::Failed
                && procedure.is_none_or(|p| row.procedure == p)
                && subject.is_none_or(|s| row.subject == s);
            if clear {
                removed.push(row.clone());
            }
            !clear
        });
        removed
    }

    /// Persist the full table atomically.
    pub fn persist(&self) -> Result<(), StoreError> {
        let snapshot = StateFile {
            version: CURRENT_STATE_VERSION,
            rows: self.rows.clone(),
        };
        let json = serde_json::to_vec(&snapshot).map_err(StoreError::Encode)?;
        let compressed = zstd::encode_all(json.as_slice(), 0)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &compressed)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

fn decode(bytes: &[u8], path: &Path) -> Result<Vec<StateRow>, StoreError> {
    let json = zstd::decode_all(bytes)?;
    let snapshot: StateFile =
        serde_json::from_slice(&json).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    if snapshot.version != CURRENT_STATE_VERSION {
        return Err(StoreError::Version {
            found: snapshot.version,
        });
    }
    Ok(snapshot.rows)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
