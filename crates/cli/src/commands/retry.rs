// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry command handler: clear failed rows for resubmission.

use super::{load_config, open_audit, open_store};
use anyhow::Result;
use nq_core::SystemClock;
use nq_engine::retry;
use std::path::Path;

pub fn handle(config_path: &Path, procedure: Option<&str>, subject: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config)?;
    let audit = open_audit(&config)?;

    let removed = retry::clear_failed(&mut store, &audit, &SystemClock, procedure, subject)?;
    if removed.is_empty() {
        println!("no failed rows matched");
        return Ok(());
    }
    for row in &removed {
        println!(
            "cleared {} {} {} (job {})",
            row.procedure, row.subject, row.session, row.job_id
        );
    }
    println!("{} row(s) eligible for resubmission", removed.len());
    Ok(())
}
