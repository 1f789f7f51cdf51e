// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State rows and the task status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a submitted task.
///
/// ```text
///          submit
/// (none) ─────────▶ pending ──▶ running ──▶ complete
///                      │          │   │
///                      └───┬──────┘   │
///                          ▼          │
///                       failed ◀──────┘
/// ```
///
/// Retry removes a `failed` row entirely, making the task eligible again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Complete => "complete",
        Failed => "failed",
    }
}

impl TaskStatus {
    /// Pending and running rows are in flight: they block resubmission.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Map a batch-manager state string to an internal status.
    ///
    /// `CANCELLED` may carry a suffix (`CANCELLED by <uid>`). Unknown
    /// states return `None` and leave the row untouched.
    pub fn from_batch_state(state: &str) -> Option<TaskStatus> {
        let state = state.trim();
        match state {
            "PENDING" => Some(TaskStatus::Pending),
            "RUNNING" => Some(TaskStatus::Running),
            "COMPLETED" => Some(TaskStatus::Complete),
            "FAILED" | "TIMEOUT" | "OUT_OF_MEMORY" | "NODE_FAIL" => Some(TaskStatus::Failed),
            s if s.starts_with("CANCELLED") => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// One record in the state store, written at submission and mutated only
/// by monitoring and reconciliation.
///
/// The `(subject, session, procedure)` triple is unique among in-flight
/// rows; historical rows may repeat across time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    pub subject: String,
    /// Empty iff the procedure is subject-scoped.
    pub session: String,
    pub procedure: String,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,
    /// Batch-manager handle; empty when the manager returned none.
    pub job_id: String,
}

impl StateRow {
    /// True when this row carries the given task coordinates.
    pub fn matches(&self, subject: &str, session: &str, procedure: &str) -> bool {
        self.subject == subject && self.session == session && self.procedure == procedure
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
