// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slurm implementation over `sbatch` and `sacct` subprocesses.
//!
//! Both subprocesses run under a finite timeout. Submission failures are
//! errors for the caller to audit; query failures degrade to an empty
//! result so monitoring can fall back to filesystem reconciliation.

use crate::{BatchError, BatchSystem, SubmitRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Ceiling on any single batch-manager subprocess.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Job-id placeholder sbatch expands in output paths.
const JOBID_PLACEHOLDER: &str = "%j";

#[derive(Debug, Clone)]
pub struct SlurmBatch {
    submit_bin: String,
    query_bin: String,
    timeout: Duration,
}

impl Default for SlurmBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl SlurmBatch {
    pub fn new() -> Self {
        Self {
            submit_bin: "sbatch".into(),
            query_bin: "sacct".into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the executables; tests point these at stub scripts.
    pub fn with_binaries(submit_bin: impl Into<String>, query_bin: impl Into<String>) -> Self {
        Self {
            submit_bin: submit_bin.into(),
            query_bin: query_bin.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl BatchSystem for SlurmBatch {
    async fn submit(&self, request: &SubmitRequest) -> Result<String, BatchError> {
        if let Some(log_dir) = &request.log_dir {
            // sbatch does not create log directories itself.
            let _ = std::fs::create_dir_all(log_dir.join(&request.log_group));
        }

        let mut command = Command::new(&self.submit_bin);
        command.args(argv(request)).kill_on_drop(true);

        let result = timeout(self.timeout, command.output())
            .await
            .map_err(|_| BatchError::Timeout {
                seconds: self.timeout.as_secs(),
            })?;
        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BatchError::MissingSubmitTool(self.submit_bin.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Err(BatchError::SubmitFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ack(&stdout).ok_or_else(|| BatchError::UnparseableAck(stdout.trim().to_string()))
    }

    async fn query(&self, job_ids: &[String]) -> Result<HashMap<String, String>, BatchError> {
        if job_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut command = Command::new(&self.query_bin);
        command
            .arg(format!("--jobs={}", job_ids.join(",")))
            .arg("--format=JobID,State")
            .arg("--noheader")
            .arg("--parsable2")
            .kill_on_drop(true);

        let result = match timeout(self.timeout, command.output()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tool = %self.query_bin, "batch query timed out");
                return Ok(HashMap::new());
            }
        };
        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(tool = %self.query_bin, "batch query tool not found");
                return Ok(HashMap::new());
            }
            Err(e) => {
                tracing::warn!(error = %e, "batch query failed");
                return Ok(HashMap::new());
            }
        };
        if !output.status.success() {
            tracing::warn!(
                exit = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "batch query returned an error"
            );
            return Ok(HashMap::new());
        }

        Ok(parse_query(&String::from_utf8_lossy(&output.stdout), job_ids))
    }

    fn render(&self, request: &SubmitRequest) -> String {
        let mut parts = vec![self.submit_bin.clone()];
        parts.extend(argv(request));
        parts.join(" ")
    }
}

/// Ordered sbatch argument list for one request.
pub(crate) fn argv(request: &SubmitRequest) -> Vec<String> {
    let mut argv = Vec::new();
    if !request.partition.is_empty() {
        argv.push(format!("--partition={}", request.partition));
    }
    if !request.account.is_empty() {
        argv.push(format!("--account={}", request.account));
    }
    argv.push(format!("--job-name={}", request.job_name));
    if let Some(mem) = &request.mem {
        argv.push(format!("--mem={mem}"));
    }
    if let Some(cpus) = request.cpus {
        argv.push(format!("--cpus-per-task={cpus}"));
    }
    if let Some(log_dir) = &request.log_dir {
        let stem = log_dir
            .join(&request.log_group)
            .join(format!("{}_{}", request.job_name, JOBID_PLACEHOLDER));
        argv.push(format!("--output={}.out", stem.display()));
        argv.push(format!("--error={}.err", stem.display()));
    }
    argv.push(request.script.clone());
    argv.extend(request.args.iter().cloned());
    argv
}

/// Extract the trailing numeric token of a submission acknowledgement
/// ("Submitted batch job 4242").
fn parse_ack(stdout: &str) -> Option<String> {
    let token = stdout.trim().lines().last()?.split_whitespace().last()?;
    (!token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .then(|| token.to_string())
}

/// Parse `JobID|State` lines, keeping only whole-job rows for the
/// requested identifiers (job steps like `123.batch` are dropped).
fn parse_query(stdout: &str, job_ids: &[String]) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| {
            let (id, state) = line.trim().split_once('|')?;
            (!id.contains('.') && job_ids.iter().any(|requested| requested == id))
                .then(|| (id.to_string(), state.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "slurm_tests.rs"]
mod tests;
