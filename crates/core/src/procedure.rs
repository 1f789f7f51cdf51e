// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Procedure declarations: the processing steps a pipeline schedules.

use crate::layout::StudyLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Keying granularity of a procedure.
///
/// Session-scoped procedures run once per `(subject, session)`;
/// subject-scoped procedures run once per subject across all sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Session,
    Subject,
}

crate::simple_display! {
    Scope {
        Session => "session",
        Subject => "subject",
    }
}

/// Declares when a procedure's output directory counts as complete.
///
/// Patterns are evaluated relative to the procedure's output directory.
/// A pattern containing `*`, `?`, or `[` is a recursive glob; anything
/// else is a literal relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionMarker {
    /// A single glob or literal path.
    Single(String),
    /// Every pattern must match at least one file (AND).
    All(Vec<String>),
}

/// A declared processing step. Immutable for the lifetime of a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// Short unique identifier; appears in state rows and job names.
    pub name: String,
    /// Relative segment under the derivatives root; empty means the
    /// procedure writes straight into the BIDS root.
    #[serde(default)]
    pub output_dir: String,
    /// Submission script identifier, passed to the batch manager verbatim.
    pub script: String,
    pub scope: Scope,
    /// Names of procedures declared earlier in the list.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Absent means "output directory is non-empty".
    #[serde(default)]
    pub completion_marker: Option<CompletionMarker>,
}

impl Procedure {
    /// Root directory this procedure writes under.
    pub fn output_root(&self, layout: &StudyLayout) -> PathBuf {
        if self.output_dir.is_empty() {
            layout.bids_root.clone()
        } else {
            layout.derivatives_root.join(&self.output_dir)
        }
    }

    /// Output directory for one work key.
    ///
    /// Session scope keys by `subject/session`, subject scope by
    /// `subject` alone (the `session` argument is ignored).
    pub fn output_path(&self, layout: &StudyLayout, subject: &str, session: &str) -> PathBuf {
        let subject_dir = self.output_root(layout).join(subject);
        match self.scope {
            Scope::Session => subject_dir.join(session),
            Scope::Subject => subject_dir,
        }
    }

    /// Batch job name: `<procedure>_<subject>` for subject scope,
    /// `<procedure>_<subject>_<session>` for session scope.
    pub fn job_name(&self, subject: &str, session: &str) -> String {
        match self.scope {
            Scope::Subject => format!("{}_{}", self.name, subject),
            Scope::Session => format!("{}_{}_{}", self.name, subject, session),
        }
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
