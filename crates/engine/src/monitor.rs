// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor: poll the batch manager and converge in-flight rows.

use crate::error::EngineError;
use nq_batch::BatchSystem;
use nq_core::{AuditEvent, Clock, TaskStatus};
use nq_storage::{AuditLog, StateStore};

/// Update every in-flight row from the batch manager's view.
///
/// Returns the number of rows that changed status. An unreachable
/// manager degrades to "no news": statuses stay put and reconciliation
/// gets its chance.
pub async fn monitor_batch(
    store: &mut StateStore,
    batch: &dyn BatchSystem,
    audit: &AuditLog,
    clock: &impl Clock,
) -> Result<usize, EngineError> {
    let in_flight = store.in_flight();

    // Step identifiers (containing '.') are never polled.
    let job_ids: Vec<String> = in_flight
        .iter()
        .filter_map(|&index| store.row(index))
        .map(|row| row.job_id.clone())
        .filter(|id| !id.is_empty() && !id.contains('.'))
        .collect();
    if job_ids.is_empty() {
        return Ok(0);
    }

    let states = match batch.query(&job_ids).await {
        Ok(states) => states,
        Err(e) => {
            tracing::warn!(error = %e, "batch query unavailable; keeping statuses");
            return Ok(0);
        }
    };

    let mut changed = 0;
    for index in in_flight {
        let Some(row) = store.row(index).cloned() else {
            continue;
        };
        let Some(state) = states.get(&row.job_id) else {
            continue;
        };
        let Some(new_status) = TaskStatus::from_batch_state(state) else {
            continue;
        };
        if new_status == row.status {
            continue;
        }
        let Some(old_status) = store.set_status(index, new_status) else {
            continue;
        };
        tracing::info!(
            subject = %row.subject,
            procedure = %row.procedure,
            job_id = %row.job_id,
            %old_status,
            %new_status,
            "status change"
        );
        audit.append(&AuditEvent::status_change(
            clock.now_utc(),
            &row,
            old_status,
            new_status,
        ))?;
        changed += 1;
    }
    Ok(changed)
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
