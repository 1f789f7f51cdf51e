// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit events: the append-only operator record.
//!
//! Every significant scheduler action produces one event, serialized as a
//! single JSON line. Absent fields are omitted from the serialized form.

use crate::state::{StateRow, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Submitted,
    StatusChange,
    Error,
    DryRun,
    RetryCleared,
}

crate::simple_display! {
    EventKind {
        Submitted => "submitted",
        StatusChange => "status_change",
        Error => "error",
        DryRun => "dry_run",
        RetryCleared => "retry_cleared",
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    fn base(timestamp: DateTime<Utc>, event: EventKind) -> Self {
        Self {
            timestamp,
            event,
            subject: None,
            session: None,
            procedure: None,
            job_id: None,
            old_status: None,
            new_status: None,
            detail: None,
        }
    }

    fn with_task(mut self, subject: &str, session: &str, procedure: &str) -> Self {
        self.subject = Some(subject.to_string());
        if !session.is_empty() {
            self.session = Some(session.to_string());
        }
        self.procedure = Some(procedure.to_string());
        self
    }

    /// A task was handed to the batch manager.
    pub fn submitted(
        timestamp: DateTime<Utc>,
        subject: &str,
        session: &str,
        procedure: &str,
        job_id: &str,
    ) -> Self {
        let mut event = Self::base(timestamp, EventKind::Submitted).with_task(
            subject, session, procedure,
        );
        event.job_id = Some(job_id.to_string());
        event
    }

    /// Monitoring or reconciliation moved a row to a new status.
    pub fn status_change(
        timestamp: DateTime<Utc>,
        row: &StateRow,
        old_status: TaskStatus,
        new_status: TaskStatus,
    ) -> Self {
        let mut event = Self::base(timestamp, EventKind::StatusChange).with_task(
            &row.subject,
            &row.session,
            &row.procedure,
        );
        if !row.job_id.is_empty() {
            event.job_id = Some(row.job_id.clone());
        }
        event.old_status = Some(old_status);
        event.new_status = Some(new_status);
        event
    }

    /// A per-task failure that did not abort the pass.
    pub fn error(
        timestamp: DateTime<Utc>,
        subject: &str,
        session: &str,
        procedure: &str,
        detail: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(timestamp, EventKind::Error).with_task(
            subject, session, procedure,
        );
        event.detail = Some(detail.into());
        event
    }

    /// Dry-run submission; `detail` carries the full command line.
    pub fn dry_run(
        timestamp: DateTime<Utc>,
        subject: &str,
        session: &str,
        procedure: &str,
        command: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(timestamp, EventKind::DryRun).with_task(
            subject, session, procedure,
        );
        event.detail = Some(command.into());
        event
    }

    /// A failed row was removed so the task can re-queue.
    pub fn retry_cleared(timestamp: DateTime<Utc>, row: &StateRow) -> Self {
        let mut event = Self::base(timestamp, EventKind::RetryCleared).with_task(
            &row.subject,
            &row.session,
            &row.procedure,
        );
        if !row.job_id.is_empty() {
            event.job_id = Some(row.job_id.clone());
        }
        event.old_status = Some(row.status);
        event
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
