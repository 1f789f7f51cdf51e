// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level failures: anything fatal to the current pass.
//!
//! Per-task submission failures are not represented here; they become
//! `error` audit events and the pass continues.

use nq_storage::{AuditError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error("sessions index {path}: {reason}")]
    SessionsIndex { path: PathBuf, reason: String },
    #[error("manifest references unknown procedure {0}")]
    UnknownProcedure(String),
}
