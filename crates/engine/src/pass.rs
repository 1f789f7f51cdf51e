// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One scheduler pass: discover, converge, evaluate, submit, persist.
//!
//! The pass is a short sequential transaction under the state store's
//! advisory lock. Ordering matters: monitoring runs before
//! reconciliation so the filesystem fallback observes freshly promoted
//! rows, and the manifest is built only after both.

use crate::error::EngineError;
use crate::manifest::{self, ManifestRow};
use crate::rules::RuleOptions;
use crate::{discover, monitor, reconcile, submit};
use nq_batch::BatchSystem;
use nq_core::Clock;
use nq_pipeline::PipelineConfig;
use nq_storage::{AuditLog, StateStore};

/// Operator toggles for one `run` invocation.
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Render and audit submissions without executing them.
    pub dry_run: bool,
    /// Re-queue procedures whose output is already complete.
    pub force: bool,
    /// Restrict `force` to a single procedure.
    pub procedure: Option<String>,
    /// Skip the batch-manager poll (reconciliation still runs).
    pub skip_monitor: bool,
}

/// What one pass did, for operator output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub discovered: usize,
    pub monitor_changes: usize,
    pub reconciled: usize,
    /// Manifest rows after the in-flight filter.
    pub tasks: usize,
    pub submitted: usize,
    pub failed: usize,
    pub dry_run_commands: Vec<String>,
}

/// Run one full pass.
pub async fn run_pass(
    config: &PipelineConfig,
    store: &mut StateStore,
    audit: &AuditLog,
    batch: &dyn BatchSystem,
    clock: &impl Clock,
    options: &PassOptions,
) -> Result<PassReport, EngineError> {
    let layout = config.layout();
    let rows = discover::discover(&layout, config.sessions_file.as_deref(), &config.procedures)?;

    let monitor_changes = if options.skip_monitor {
        0
    } else {
        monitor::monitor_batch(store, batch, audit, clock).await?
    };
    let reconciled = reconcile::reconcile(store, &config.procedures, &layout, audit, clock)?;

    let rule_options = RuleOptions {
        force: options.force,
        only: options.procedure.clone(),
    };
    let manifest = manifest::build_manifest(&rows, &config.procedures, &layout, &rule_options);
    let manifest = manifest::filter_in_flight(manifest, store);
    tracing::debug!(
        discovered = rows.len(),
        tasks = manifest.len(),
        "manifest built"
    );

    let outcome = submit::submit_manifest(
        &manifest, config, store, audit, batch, clock, options.dry_run,
    )
    .await?;

    store.persist()?;
    Ok(PassReport {
        discovered: rows.len(),
        monitor_changes,
        reconciled,
        tasks: manifest.len(),
        submitted: outcome.submitted,
        failed: outcome.failed,
        dry_run_commands: outcome.dry_run_commands,
    })
}

/// Build the would-be manifest without monitoring or submitting.
pub fn preview_manifest(
    config: &PipelineConfig,
    store: &StateStore,
) -> Result<Vec<ManifestRow>, EngineError> {
    let layout = config.layout();
    let rows = discover::discover(&layout, config.sessions_file.as_deref(), &config.procedures)?;
    let manifest =
        manifest::build_manifest(&rows, &config.procedures, &layout, &RuleOptions::default());
    Ok(manifest::filter_in_flight(manifest, store))
}

/// Monitor and reconcile only, then persist. Returns
/// `(monitor_changes, reconciled)`.
pub async fn run_monitor(
    config: &PipelineConfig,
    store: &mut StateStore,
    audit: &AuditLog,
    batch: &dyn BatchSystem,
    clock: &impl Clock,
) -> Result<(usize, usize), EngineError> {
    let layout = config.layout();
    let monitor_changes = monitor::monitor_batch(store, batch, audit, clock).await?;
    let reconciled = reconcile::reconcile(store, &config.procedures, &layout, audit, clock)?;
    store.persist()?;
    Ok((monitor_changes, reconciled))
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
