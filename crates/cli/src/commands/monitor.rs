// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor command handler: poll and reconcile without submitting.

use super::{load_config, open_audit, open_store};
use anyhow::Result;
use nq_batch::SlurmBatch;
use nq_core::SystemClock;
use nq_engine::pass;
use std::path::Path;

pub async fn handle(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config)?;
    let audit = open_audit(&config)?;
    let batch = SlurmBatch::new();

    let (monitor_changes, reconciled) =
        pass::run_monitor(&config, &mut store, &audit, &batch, &SystemClock).await?;
    println!(
        "status updates: {monitor_changes} from the batch manager, {reconciled} reconciled from disk"
    );
    Ok(())
}
