// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nq_batch::fake::FakeBatch;
use nq_core::{CompletionMarker, FakeClock, Procedure, Scope, TaskStatus};
use std::fs;
use tempfile::TempDir;

const SUBJECT: &str = "sub-0001";
const SESSION: &str = "ses-202407110849";

struct Fixture {
    dir: TempDir,
    config: PipelineConfig,
    store: StateStore,
    audit: AuditLog,
    batch: FakeBatch,
    clock: FakeClock,
}

impl Fixture {
    /// Session-scoped `bids` plus a dependent subject-scoped `recon`.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            dicom_root: dir.path().join("dicom"),
            bids_root: dir.path().join("bids"),
            derivatives_root: dir.path().join("derivatives"),
            state_file: dir.path().join("scheduler/state.nq"),
            log_file: None,
            sessions_file: None,
            batch_partition: String::new(),
            batch_account: "neuro".into(),
            batch_mem: None,
            batch_cpus: None,
            batch_log_dir: None,
            procedures: vec![
                Procedure {
                    name: "bids".into(),
                    output_dir: String::new(),
                    script: "bids.sh".into(),
                    scope: Scope::Session,
                    depends_on: vec![],
                    completion_marker: Some(CompletionMarker::All(vec![
                        "anat/*_T1w.nii.gz".into(),
                    ])),
                },
                Procedure {
                    name: "recon".into(),
                    output_dir: "recon".into(),
                    script: "recon.sh".into(),
                    scope: Scope::Subject,
                    depends_on: vec!["bids".into()],
                    completion_marker: Some(CompletionMarker::Single("scripts/done".into())),
                },
            ],
        };
        config.validate().unwrap();
        let store = StateStore::open(&config.state_file).unwrap();
        let audit = AuditLog::open(config.audit_log_path()).unwrap();
        Self {
            dir,
            config,
            store,
            audit,
            batch: FakeBatch::new(),
            clock: FakeClock::new(),
        }
    }

    fn add_dicom_session(&self) {
        fs::create_dir_all(self.config.dicom_root.join(SUBJECT).join(SESSION)).unwrap();
    }

    fn complete_bids_output(&self) {
        let anat = self
            .config
            .bids_root
            .join(SUBJECT)
            .join(SESSION)
            .join("anat");
        fs::create_dir_all(&anat).unwrap();
        fs::write(anat.join(format!("{SUBJECT}_{SESSION}_T1w.nii.gz")), b"").unwrap();
    }

    async fn run(&mut self, options: &PassOptions) -> PassReport {
        run_pass(
            &self.config,
            &mut self.store,
            &self.audit,
            &self.batch,
            &self.clock,
            options,
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn fresh_session_submits_the_first_stage_only() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();

    let report = fixture.run(&PassOptions::default()).await;
    assert_eq!(report.discovered, 1);
    assert_eq!(report.tasks, 1);
    assert_eq!(report.submitted, 1);

    // Only bids fired; recon waits for its dependency.
    let requests = fixture.batch.submitted();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].script, "bids.sh");

    let rows = fixture.store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TaskStatus::Pending);
    assert_eq!(rows[0].session, SESSION);
}

#[tokio::test]
async fn second_pass_is_deduplicated_by_the_in_flight_filter() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();

    fixture.run(&PassOptions::default()).await;
    let report = fixture.run(&PassOptions::default()).await;

    assert_eq!(report.tasks, 0);
    assert_eq!(report.submitted, 0);
    assert_eq!(fixture.store.rows().len(), 1);
}

#[tokio::test]
async fn completion_unlocks_the_dependent_stage() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();
    fixture.run(&PassOptions::default()).await;

    // The bids job finishes: output lands and the manager confirms.
    fixture.complete_bids_output();
    let job_id = fixture.store.rows()[0].job_id.clone();
    fixture.batch.set_state(&job_id, "COMPLETED");

    let report = fixture.run(&PassOptions::default()).await;
    assert_eq!(report.monitor_changes, 1);
    assert_eq!(report.tasks, 1);
    assert_eq!(report.submitted, 1);

    let recon_row = fixture
        .store
        .rows()
        .iter()
        .find(|row| row.procedure == "recon")
        .cloned()
        .unwrap();
    assert_eq!(recon_row.session, "");
    assert_eq!(recon_row.status, TaskStatus::Pending);

    // The subject-scoped submission carries the subject alone.
    let requests = fixture.batch.submitted();
    assert_eq!(requests[1].args, vec![SUBJECT]);
}

#[tokio::test]
async fn dry_run_renders_commands_without_state() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();

    let options = PassOptions {
        dry_run: true,
        ..PassOptions::default()
    };
    let report = fixture.run(&options).await;

    assert_eq!(report.tasks, 1);
    assert_eq!(report.submitted, 0);
    assert_eq!(report.dry_run_commands.len(), 1);
    assert!(report.dry_run_commands[0].contains("bids.sh"));
    assert!(fixture.store.is_empty());
    assert!(fixture.batch.submitted().is_empty());
}

#[tokio::test]
async fn empty_dicom_root_does_nothing() {
    let mut fixture = Fixture::new();
    let report = fixture.run(&PassOptions::default()).await;
    assert_eq!(report.discovered, 0);
    assert_eq!(report.tasks, 0);
    assert_eq!(report.submitted, 0);
    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn manager_outage_still_reconciles_from_disk() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();
    fixture.run(&PassOptions::default()).await;

    fixture.complete_bids_output();
    fixture.batch.set_query_down(true);

    let report = fixture.run(&PassOptions::default()).await;
    assert_eq!(report.monitor_changes, 0);
    assert_eq!(report.reconciled, 1);

    let bids_row = fixture
        .store
        .rows()
        .iter()
        .find(|row| row.procedure == "bids")
        .cloned()
        .unwrap();
    assert_eq!(bids_row.status, TaskStatus::Complete);
    // With bids reconciled complete, recon was free to submit.
    assert_eq!(report.submitted, 1);
}

#[tokio::test]
async fn skip_monitor_leaves_the_manager_alone() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();
    fixture.run(&PassOptions::default()).await;

    let job_id = fixture.store.rows()[0].job_id.clone();
    fixture.batch.set_state(&job_id, "COMPLETED");

    let options = PassOptions {
        skip_monitor: true,
        ..PassOptions::default()
    };
    let report = fixture.run(&options).await;
    assert_eq!(report.monitor_changes, 0);
    assert_eq!(fixture.store.rows()[0].status, TaskStatus::Pending);
}

#[tokio::test]
async fn preview_matches_what_run_would_submit_and_is_stable() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();

    let first = preview_manifest(&fixture.config, &fixture.store).unwrap();
    let second = preview_manifest(&fixture.config, &fixture.store).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].procedure, "bids");
    assert_eq!(first[0].priority, 0);

    // Previewing never mutates anything.
    assert!(fixture.store.is_empty());
    assert!(fixture.audit.read_all().unwrap().is_empty());
    assert!(fixture.dir.path().join("scheduler").exists());
}

#[tokio::test]
async fn forced_requeue_bypasses_only_the_completion_check() {
    let mut fixture = Fixture::new();
    fixture.add_dicom_session();
    fixture.complete_bids_output();

    // Nothing to do normally: bids is complete, recon's marker is absent
    // but its dependency is satisfied, so only recon fires.
    let report = fixture.run(&PassOptions::default()).await;
    assert_eq!(report.tasks, 1);

    // Force bids alone: it re-queues even though complete.
    let options = PassOptions {
        force: true,
        procedure: Some("bids".into()),
        ..PassOptions::default()
    };
    let report = fixture.run(&options).await;
    assert_eq!(report.tasks, 1);
    let last = fixture.batch.submitted().pop().unwrap();
    assert_eq!(last.script, "bids.sh");
}
