// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile: filesystem fallback for jobs the batch manager forgot.
//!
//! Covers identifiers aged out of the accounting database, renumbered
//! jobs, and work performed out-of-band: if the output is complete on
//! disk, the row is complete, whatever the manager says.

use crate::error::EngineError;
use crate::oracle::{self, OracleCtx};
use nq_core::{AuditEvent, Clock, Procedure, StudyLayout, TaskStatus};
use nq_storage::{AuditLog, StateStore};

/// Promote in-flight rows whose output the oracle reports complete.
pub fn reconcile(
    store: &mut StateStore,
    procedures: &[Procedure],
    layout: &StudyLayout,
    audit: &AuditLog,
    clock: &impl Clock,
) -> Result<usize, EngineError> {
    let mut promoted = 0;
    for index in store.in_flight() {
        let Some(row) = store.row(index).cloned() else {
            continue;
        };
        // Rows for procedures no longer configured stay as they are.
        let Some(procedure) = procedures.iter().find(|p| p.name == row.procedure) else {
            continue;
        };
        let output = procedure.output_path(layout, &row.subject, &row.session);
        let ctx = OracleCtx {
            layout,
            subject: &row.subject,
            session: &row.session,
        };
        if !oracle::is_complete(procedure, &output, &ctx) {
            continue;
        }
        let Some(old_status) = store.set_status(index, TaskStatus::Complete) else {
            continue;
        };
        tracing::info!(
            subject = %row.subject,
            procedure = %row.procedure,
            job_id = %row.job_id,
            "reconciled from disk"
        );
        audit.append(&AuditEvent::status_change(
            clock.now_utc(),
            &row,
            old_status,
            TaskStatus::Complete,
        ))?;
        promoted += 1;
    }
    Ok(promoted)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
