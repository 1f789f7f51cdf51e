// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run command handler: one full scheduling pass.

use super::{load_config, open_audit, open_store};
use anyhow::Result;
use nq_batch::SlurmBatch;
use nq_core::SystemClock;
use nq_engine::{pass, PassOptions};
use std::path::Path;

pub async fn handle(config_path: &Path, options: PassOptions) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config)?;
    let audit = open_audit(&config)?;
    let batch = SlurmBatch::new();

    let report = pass::run_pass(&config, &mut store, &audit, &batch, &SystemClock, &options).await?;

    for command in &report.dry_run_commands {
        println!("{command}");
    }
    println!(
        "discovered {} session(s); {} task(s) after in-flight filter",
        report.discovered, report.tasks
    );
    if report.monitor_changes > 0 || report.reconciled > 0 {
        println!(
            "status updates: {} from the batch manager, {} reconciled from disk",
            report.monitor_changes, report.reconciled
        );
    }
    if options.dry_run {
        println!("dry run: {} submission(s) rendered", report.dry_run_commands.len());
    } else {
        println!("submitted {}, failed {}", report.submitted, report.failed);
    }
    Ok(())
}
