// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest command handler: show what the next pass would submit.

use super::{load_config, open_store};
use crate::output::Table;
use anyhow::Result;
use nq_engine::pass;
use std::path::Path;

pub fn handle(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let manifest = pass::preview_manifest(&config, &store)?;
    if manifest.is_empty() {
        println!("manifest is empty: nothing to submit");
        return Ok(());
    }

    let mut table = Table::new(&["PRIORITY", "PROCEDURE", "SUBJECT", "SESSION", "DICOM"]);
    for row in &manifest {
        table.row(vec![
            row.priority.to_string(),
            row.procedure.clone(),
            row.key.subject.clone(),
            row.key.session.clone(),
            row.key.dicom_path.display().to_string(),
        ]);
    }
    print!("{}", table.render());
    println!("{} task(s)", manifest.len());
    Ok(())
}
