// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem layout of a study: the three path roots.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path roots every component resolves against.
///
/// Raw acquisitions live under `dicom_root`, converted data under
/// `bids_root`, and processed outputs under `derivatives_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLayout {
    pub dicom_root: PathBuf,
    pub bids_root: PathBuf,
    pub derivatives_root: PathBuf,
}

impl StudyLayout {
    /// BIDS directory of one subject.
    pub fn subject_bids_dir(&self, subject: &str) -> PathBuf {
        self.bids_root.join(subject)
    }
}
