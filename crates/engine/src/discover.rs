// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discover: enumerate candidate work keys and enrich them.
//!
//! Two modes. Without a sessions index, walk `dicom_root/sub-*/ses-*`
//! one row per session directory. With one, read the tabular index and
//! canonicalize its identifiers. Either way every row is enriched with
//! per-procedure output probes so rule evaluation touches each path once.

use crate::error::EngineError;
use nq_core::{sanitize_session, sanitize_subject, Procedure, StudyLayout, WorkKey};
use std::fs;
use std::path::{Path, PathBuf};

/// Output-path probe for one `(work key, procedure)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProbe {
    pub path: PathBuf,
    pub exists: bool,
}

/// One candidate `(subject, session)` with per-procedure enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverRow {
    pub key: WorkKey,
    pub dicom_exists: bool,
    /// Aligned with the configured procedure list.
    pub outputs: Vec<OutputProbe>,
}

/// Build the discover table: one row per session, in stable order.
pub fn discover(
    layout: &StudyLayout,
    sessions_file: Option<&Path>,
    procedures: &[Procedure],
) -> Result<Vec<DiscoverRow>, EngineError> {
    let keys = match sessions_file {
        Some(index) => read_sessions_index(index)?,
        None => walk_dicom_root(&layout.dicom_root),
    };
    Ok(keys
        .into_iter()
        .map(|key| enrich(key, procedures, layout))
        .collect())
}

/// Walk `dicom_root/sub-*/ses-*`, one key per session directory.
fn walk_dicom_root(dicom_root: &Path) -> Vec<WorkKey> {
    let mut keys = Vec::new();
    for subject_dir in matching_children(dicom_root, "sub-") {
        let subject = name_of(&subject_dir);
        for session_dir in matching_children(&subject_dir, "ses-") {
            keys.push(WorkKey::new(subject.clone(), name_of(&session_dir), session_dir));
        }
    }
    keys
}

/// Sorted child directories whose names start with `prefix`.
/// A missing or unreadable directory reads as empty.
fn matching_children(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    };
    children.sort();
    children
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read the tabular sessions index (header row, comma or tab separated).
///
/// `SubjectCode` and `ScanID` are required columns; `dicom_path` is
/// copied verbatim and left empty when the column is absent. Every data
/// row yields a key — a blank `dicom_path` is kept and simply fails the
/// dicom-existence rule later.
fn read_sessions_index(path: &Path) -> Result<Vec<WorkKey>, EngineError> {
    let text = fs::read_to_string(path).map_err(|e| EngineError::SessionsIndex {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| EngineError::SessionsIndex {
        path: path.to_path_buf(),
        reason: "empty index".into(),
    })?;
    let separator = if header.contains('\t') { '\t' } else { ',' };
    let columns: Vec<&str> = header.split(separator).map(str::trim).collect();

    let subject_col = required_column(path, &columns, "SubjectCode")?;
    let scan_col = required_column(path, &columns, "ScanID")?;
    let dicom_col = columns.iter().position(|name| *name == "dicom_path");

    let mut keys = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(separator).map(str::trim).collect();
        let subject = sanitize_subject(fields.get(subject_col).copied().unwrap_or(""));
        let session = sanitize_session(fields.get(scan_col).copied().unwrap_or(""));
        let dicom_path = dicom_col
            .and_then(|col| fields.get(col))
            .copied()
            .unwrap_or("");
        keys.push(WorkKey::new(subject, session, dicom_path));
    }
    Ok(keys)
}

fn required_column(path: &Path, columns: &[&str], name: &str) -> Result<usize, EngineError> {
    columns
        .iter()
        .position(|column| *column == name)
        .ok_or_else(|| EngineError::SessionsIndex {
            path: path.to_path_buf(),
            reason: format!("missing required column {name}"),
        })
}

/// Attach per-procedure output probes and the dicom-existence flag.
fn enrich(key: WorkKey, procedures: &[Procedure], layout: &StudyLayout) -> DiscoverRow {
    let outputs = procedures
        .iter()
        .map(|procedure| {
            let path = procedure.output_path(layout, &key.subject, &key.session);
            let exists = path.is_dir();
            OutputProbe { path, exists }
        })
        .collect();
    let dicom_exists = !key.dicom_path.as_os_str().is_empty() && key.dicom_path.exists();
    DiscoverRow {
        key,
        dicom_exists,
        outputs,
    }
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
