// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission: manifest rows → batch jobs → pending state rows.

use crate::error::EngineError;
use crate::manifest::ManifestRow;
use nq_batch::{BatchSystem, SubmitRequest};
use nq_core::{AuditEvent, Clock, Procedure, Scope, StateRow, TaskStatus};
use nq_pipeline::PipelineConfig;
use nq_storage::{AuditLog, StateStore};

/// Counters and dry-run output for one submission batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub submitted: usize,
    pub failed: usize,
    /// Rendered command lines when running dry.
    pub dry_run_commands: Vec<String>,
}

/// Submit every manifest row, in manifest order.
///
/// Per-task failures audit an `error` event and continue; one bad task
/// never aborts the batch. Each success appends a `pending` row and
/// persists the store immediately, so a crash mid-batch cannot forget
/// jobs already handed to the cluster.
pub async fn submit_manifest(
    manifest: &[ManifestRow],
    config: &PipelineConfig,
    store: &mut StateStore,
    audit: &AuditLog,
    batch: &dyn BatchSystem,
    clock: &impl Clock,
    dry_run: bool,
) -> Result<SubmitOutcome, EngineError> {
    let mut outcome = SubmitOutcome::default();

    for row in manifest {
        let procedure = config
            .procedure(&row.procedure)
            .ok_or_else(|| EngineError::UnknownProcedure(row.procedure.clone()))?;
        let request = submit_request(row, procedure, config);

        if dry_run {
            let command = batch.render(&request);
            audit.append(&AuditEvent::dry_run(
                clock.now_utc(),
                &row.key.subject,
                &row.key.session,
                &row.procedure,
                &command,
            ))?;
            outcome.dry_run_commands.push(command);
            continue;
        }

        match batch.submit(&request).await {
            Ok(job_id) => {
                let now = clock.now_utc();
                tracing::info!(
                    subject = %row.key.subject,
                    procedure = %row.procedure,
                    job_id = %job_id,
                    "submitted"
                );
                audit.append(&AuditEvent::submitted(
                    now,
                    &row.key.subject,
                    &row.key.session,
                    &row.procedure,
                    &job_id,
                ))?;
                store.push(StateRow {
                    subject: row.key.subject.clone(),
                    session: row.key.session.clone(),
                    procedure: row.procedure.clone(),
                    status: TaskStatus::Pending,
                    submitted_at: now,
                    job_id,
                });
                // Submitted jobs must survive a crash mid-batch.
                store.persist()?;
                outcome.submitted += 1;
            }
            Err(e) => {
                tracing::warn!(
                    subject = %row.key.subject,
                    procedure = %row.procedure,
                    error = %e,
                    "submission failed"
                );
                audit.append(&AuditEvent::error(
                    clock.now_utc(),
                    &row.key.subject,
                    &row.key.session,
                    &row.procedure,
                    e.to_string(),
                ))?;
                outcome.failed += 1;
            }
        }
    }
    Ok(outcome)
}

/// Compose the batch request for one task.
fn submit_request(row: &ManifestRow, procedure: &Procedure, config: &PipelineConfig) -> SubmitRequest {
    let args = match procedure.scope {
        Scope::Subject => vec![row.key.subject.clone()],
        Scope::Session => vec![
            row.key.subject.clone(),
            row.key.session.clone(),
            row.key.dicom_path.to_string_lossy().into_owned(),
        ],
    };
    SubmitRequest {
        script: procedure.script.clone(),
        job_name: procedure.job_name(&row.key.subject, &row.key.session),
        args,
        log_group: procedure.name.clone(),
        partition: config.batch_partition.clone(),
        account: config.batch_account.clone(),
        mem: config.batch_mem.clone(),
        cpus: config.batch_cpus,
        log_dir: config.batch_log_dir.clone(),
    }
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
