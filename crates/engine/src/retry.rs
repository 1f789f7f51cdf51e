// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry: clear failed rows so the next pass can re-queue them.

use crate::error::EngineError;
use nq_core::{AuditEvent, Clock, StateRow};
use nq_storage::{AuditLog, StateStore};

/// Remove `failed` rows matching the optional filters and persist.
///
/// Returns the removed rows. Pending, running, and complete rows are
/// never touched.
pub fn clear_failed(
    store: &mut StateStore,
    audit: &AuditLog,
    clock: &impl Clock,
    procedure: Option<&str>,
    subject: Option<&str>,
) -> Result<Vec<StateRow>, EngineError> {
    let removed = store.take_failed(procedure, subject);
    for row in &removed {
        tracing::info!(
            subject = %row.subject,
            procedure = %row.procedure,
            job_id = %row.job_id,
            "cleared failed row for retry"
        );
        audit.append(&AuditEvent::retry_cleared(clock.now_utc(), row))?;
    }
    if !removed.is_empty() {
        store.persist()?;
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
