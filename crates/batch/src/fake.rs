// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory batch manager for tests.
//!
//! Records every submission, hands out sequential job identifiers, and
//! serves whatever states the test scripted. `set_query_down` simulates a
//! cluster whose accounting tool is unreachable.

use crate::{slurm, BatchError, BatchSystem, SubmitRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    next_id: u64,
    submitted: Vec<SubmitRequest>,
    states: HashMap<String, String>,
    fail_submissions: bool,
    query_down: bool,
}

/// Scriptable [`BatchSystem`] double.
#[derive(Clone, Default)]
pub struct FakeBatch {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.inner.lock().submitted.clone()
    }

    /// Script the state string `query` returns for a job.
    pub fn set_state(&self, job_id: impl Into<String>, state: impl Into<String>) {
        self.inner.lock().states.insert(job_id.into(), state.into());
    }

    /// Make every subsequent submission fail.
    pub fn fail_submissions(&self, fail: bool) {
        self.inner.lock().fail_submissions = fail;
    }

    /// Simulate an unreachable accounting tool: queries return nothing.
    pub fn set_query_down(&self, down: bool) {
        self.inner.lock().query_down = down;
    }
}

#[async_trait]
impl BatchSystem for FakeBatch {
    async fn submit(&self, request: &SubmitRequest) -> Result<String, BatchError> {
        let mut inner = self.inner.lock();
        if inner.fail_submissions {
            return Err(BatchError::SubmitFailed {
                exit_code: Some(1),
                stderr: "sbatch: error: submission rejected".into(),
            });
        }
        inner.next_id += 1;
        let job_id = (1000 + inner.next_id).to_string();
        inner.submitted.push(request.clone());
        inner.states.insert(job_id.clone(), "PENDING".into());
        Ok(job_id)
    }

    async fn query(&self, job_ids: &[String]) -> Result<HashMap<String, String>, BatchError> {
        let inner = self.inner.lock();
        if inner.query_down {
            return Ok(HashMap::new());
        }
        Ok(job_ids
            .iter()
            .filter_map(|id| inner.states.get(id).map(|state| (id.clone(), state.clone())))
            .collect())
    }

    fn render(&self, request: &SubmitRequest) -> String {
        let mut parts = vec!["sbatch".to_string()];
        parts.extend(slurm::argv(request));
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hands_out_sequential_ids_and_records_requests() {
        let batch = FakeBatch::new();
        let request = SubmitRequest {
            script: "bids.sh".into(),
            job_name: "bids_sub-0001_ses-1".into(),
            args: vec!["sub-0001".into()],
            log_group: "bids".into(),
            partition: String::new(),
            account: String::new(),
            mem: None,
            cpus: None,
            log_dir: None,
        };
        assert_eq!(batch.submit(&request).await.unwrap(), "1001");
        assert_eq!(batch.submit(&request).await.unwrap(), "1002");
        assert_eq!(batch.submitted().len(), 2);
    }

    #[tokio::test]
    async fn query_reflects_scripted_states() {
        let batch = FakeBatch::new();
        batch.set_state("1001", "COMPLETED");
        let states = batch
            .query(&["1001".to_string(), "9999".to_string()])
            .await
            .unwrap();
        assert_eq!(states["1001"], "COMPLETED");
        assert!(!states.contains_key("9999"));

        batch.set_query_down(true);
        assert!(batch.query(&["1001".to_string()]).await.unwrap().is_empty());
    }
}
