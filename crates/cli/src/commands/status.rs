// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status command handler: summarize the state store.

use super::{load_config, open_store};
use crate::output::Table;
use anyhow::Result;
use nq_core::TaskStatus;
use std::path::Path;

pub fn handle(config_path: &Path, all: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    if store.is_empty() {
        println!("state store is empty: nothing submitted yet");
        return Ok(());
    }

    let count = |status: TaskStatus| {
        store
            .rows()
            .iter()
            .filter(|row| row.status == status)
            .count()
    };
    println!(
        "{} row(s): {} pending, {} running, {} complete, {} failed",
        store.rows().len(),
        count(TaskStatus::Pending),
        count(TaskStatus::Running),
        count(TaskStatus::Complete),
        count(TaskStatus::Failed),
    );

    let mut table = Table::new(&["PROCEDURE", "SUBJECT", "SESSION", "STATUS", "SUBMITTED", "JOB"]);
    for row in store.rows() {
        if !all && !row.status.is_in_flight() {
            continue;
        }
        table.row(vec![
            row.procedure.clone(),
            row.subject.clone(),
            row.session.clone(),
            row.status.to_string(),
            row.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            row.job_id.clone(),
        ]);
    }
    if !table.is_empty() {
        println!();
        print!("{}", table.render());
    }
    Ok(())
}
