// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod manifest;
pub mod monitor;
pub mod retry;
pub mod run;
pub mod status;

use crate::exit_error::ExitError;
use anyhow::Result;
use nq_pipeline::PipelineConfig;
use nq_storage::{AuditLog, StateStore};
use std::path::Path;

/// Load and validate the configuration; problems exit with code 2.
pub(crate) fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::load(path).map_err(|e| ExitError::config(format!("configuration error: {e}")).into())
}

pub(crate) fn open_store(config: &PipelineConfig) -> Result<StateStore> {
    Ok(StateStore::open(&config.state_file)?)
}

pub(crate) fn open_audit(config: &PipelineConfig) -> Result<AuditLog> {
    Ok(AuditLog::open(config.audit_log_path())?)
}
