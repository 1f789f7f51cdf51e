// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nq-batch: the batch-manager seam.
//!
//! The scheduler core talks to the cluster through [`BatchSystem`]: one
//! operation to submit a script, one to query job states. The production
//! implementation shells out to `sbatch`/`sacct`; tests use the in-memory
//! [`fake::FakeBatch`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub mod slurm;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use slurm::SlurmBatch;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("submission failed (exit {exit_code:?}): {stderr}")]
    SubmitFailed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("unparseable submission acknowledgement: {0:?}")]
    UnparseableAck(String),
    #[error("submission binary not found: {0}")]
    MissingSubmitTool(String),
    #[error("batch command timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the batch manager needs to run one task.
///
/// The caller has already resolved procedure scope into the job name and
/// positional arguments; this struct is scheduler-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Submission script identifier, passed through verbatim.
    pub script: String,
    pub job_name: String,
    /// Positional arguments after the script.
    pub args: Vec<String>,
    /// Grouping segment for stdout/stderr paths (the procedure name).
    pub log_group: String,
    /// Empty means the partition flag is omitted.
    pub partition: String,
    /// Empty means the account flag is omitted.
    pub account: String,
    pub mem: Option<String>,
    pub cpus: Option<u32>,
    /// When set, stdout/stderr land under
    /// `<log_dir>/<log_group>/<job_name>_<jobid>.{out,err}`.
    pub log_dir: Option<PathBuf>,
}

/// Abstract batch manager: submit a task, query job states.
#[async_trait]
pub trait BatchSystem: Send + Sync {
    /// Submit one task; returns the batch job identifier.
    async fn submit(&self, request: &SubmitRequest) -> Result<String, BatchError>;

    /// Current state string per job identifier.
    ///
    /// Identifiers absent from the result are unknown to the manager.
    /// A missing query tool yields an empty result, not an error.
    async fn query(&self, job_ids: &[String]) -> Result<HashMap<String, String>, BatchError>;

    /// The full command line `submit` would execute, for dry runs and
    /// audit records.
    fn render(&self, request: &SubmitRequest) -> String;
}
