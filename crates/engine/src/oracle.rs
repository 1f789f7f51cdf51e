// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion oracle: is a procedure's output complete on disk?
//!
//! The generic check interprets the procedure's completion marker; a few
//! procedures layer additional session-count conditions on top, selected
//! by name. The oracle never raises — missing directories, unreadable
//! files, and malformed marker files all read as incomplete, so the work
//! re-queues rather than silently disappearing.

use nq_core::{CompletionMarker, Procedure, StudyLayout};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker file the subject reconstruction tool leaves behind.
const RECON_DONE: &str = "scripts/recon-all.done";

/// Derivatives segment the preprocessing stage writes under.
const PREP_DIR: &str = "qsiprep";

/// Context the specialized checks resolve against.
#[derive(Debug, Clone, Copy)]
pub struct OracleCtx<'a> {
    pub layout: &'a StudyLayout,
    pub subject: &'a str,
    /// Empty for subject-scoped rows.
    pub session: &'a str,
}

/// True iff `procedure`'s output at `output` is complete.
pub fn is_complete(procedure: &Procedure, output: &Path, ctx: &OracleCtx<'_>) -> bool {
    let generic = generic_complete(procedure.completion_marker.as_ref(), output);
    match procedure.name.as_str() {
        "freesurfer" => generic && recon_inputs_current(output, ctx),
        "qsiprep" => generic && prep_covers_dwi_sessions(output, ctx),
        "qsirecon" => generic && recon_covers_prep_sessions(output, ctx),
        _ => generic,
    }
}

fn generic_complete(marker: Option<&CompletionMarker>, output: &Path) -> bool {
    if !output.is_dir() {
        return false;
    }
    match marker {
        None => dir_non_empty(output),
        Some(CompletionMarker::Single(pattern)) => marker_present(output, pattern),
        Some(CompletionMarker::All(patterns)) => {
            !patterns.is_empty() && patterns.iter().all(|pattern| marker_present(output, pattern))
        }
    }
}

fn dir_non_empty(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// A pattern with glob metacharacters matches recursively; anything else
/// is a literal relative path.
fn marker_present(dir: &Path, pattern: &str) -> bool {
    if has_glob_meta(pattern) {
        !glob_files(dir, pattern).is_empty()
    } else {
        dir.join(pattern).exists()
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Recursive glob under `dir`, yielding files only.
fn glob_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let full = dir.join("**").join(pattern);
    let Some(full) = full.to_str() else {
        return Vec::new();
    };
    match glob::glob(full) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Subject reconstruction: the done-marker records which T1w inputs the
/// run consumed. A count mismatch with the files now on disk means a
/// session arrived after the run, and the subject must re-queue.
fn recon_inputs_current(output: &Path, ctx: &OracleCtx<'_>) -> bool {
    let Some(recorded) = recorded_input_count(&output.join(RECON_DONE)) else {
        return false;
    };
    recorded == t1w_count(&ctx.layout.subject_bids_dir(ctx.subject))
}

/// Count `-i` flags on the `#CMDARGS` line of `recon-all.done`.
fn recorded_input_count(marker: &Path) -> Option<usize> {
    let text = fs::read_to_string(marker).ok()?;
    let line = text.lines().find(|line| line.starts_with("#CMDARGS"))?;
    Some(line.split_whitespace().filter(|token| *token == "-i").count())
}

/// T1-weighted NIfTI files anywhere under the subject's BIDS directory.
fn t1w_count(subject_dir: &Path) -> usize {
    glob_files(subject_dir, "*_T1w.nii.gz").len() + glob_files(subject_dir, "*_T1w.nii").len()
}

/// Preprocessing must cover every BIDS session that has a DWI modality.
fn prep_covers_dwi_sessions(output: &Path, ctx: &OracleCtx<'_>) -> bool {
    let processed = session_children(output).len();
    processed > 0 && processed == dwi_session_count(&ctx.layout.subject_bids_dir(ctx.subject))
}

/// Reconstruction must cover every preprocessed session.
fn recon_covers_prep_sessions(output: &Path, ctx: &OracleCtx<'_>) -> bool {
    let prep = ctx.layout.derivatives_root.join(PREP_DIR).join(ctx.subject);
    session_children(output).len() == session_children(&prep).len()
}

/// `ses-*` child directories.
fn session_children(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("ses-"))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// BIDS sessions of the subject containing a `dwi` modality directory.
fn dwi_session_count(subject_dir: &Path) -> usize {
    session_children(subject_dir)
        .iter()
        .filter(|session| session.join("dwi").is_dir())
        .count()
}

#[cfg(test)]
#[path = "oracle_tests.rs"]
mod tests;
