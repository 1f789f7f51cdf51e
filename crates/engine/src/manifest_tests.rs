// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::discover::OutputProbe;
use chrono::{DateTime, Utc};
use nq_core::{StateRow, TaskStatus};

fn layout() -> StudyLayout {
    StudyLayout {
        dicom_root: "/nonexistent/dicom".into(),
        bids_root: "/nonexistent/bids".into(),
        derivatives_root: "/nonexistent/derivatives".into(),
    }
}

fn procedures() -> Vec<Procedure> {
    vec![
        Procedure {
            name: "bids".into(),
            output_dir: String::new(),
            script: "bids.sh".into(),
            scope: Scope::Session,
            depends_on: vec![],
            completion_marker: None,
        },
        Procedure {
            name: "freesurfer".into(),
            output_dir: "freesurfer".into(),
            script: "recon.sh".into(),
            scope: Scope::Subject,
            depends_on: vec![],
            completion_marker: None,
        },
    ]
}

/// A discover row whose outputs are all absent, so every dependency-free
/// rule fires.
fn row(subject: &str, session: &str) -> DiscoverRow {
    let layout = layout();
    let outputs = procedures()
        .iter()
        .map(|procedure| OutputProbe {
            path: procedure.output_path(&layout, subject, session),
            exists: false,
        })
        .collect();
    DiscoverRow {
        key: WorkKey::new(subject, session, format!("/nonexistent/dicom/{subject}/{session}")),
        dicom_exists: true,
        outputs,
    }
}

fn build(rows: &[DiscoverRow]) -> Vec<ManifestRow> {
    build_manifest(rows, &procedures(), &layout(), &RuleOptions::default())
}

#[test]
fn orders_by_priority_then_subject_then_session() {
    let rows = vec![
        row("sub-0002", "ses-2"),
        row("sub-0001", "ses-2"),
        row("sub-0001", "ses-1"),
    ];
    let manifest = build(&rows);
    let order: Vec<(&str, &str, usize)> = manifest
        .iter()
        .map(|r| (r.key.subject.as_str(), r.procedure.as_str(), r.priority))
        .collect();
    assert_eq!(
        order,
        vec![
            ("sub-0001", "bids", 0),
            ("sub-0001", "bids", 0),
            ("sub-0002", "bids", 0),
            ("sub-0001", "freesurfer", 1),
            ("sub-0002", "freesurfer", 1),
        ]
    );
    // Session tiebreak within a subject.
    assert_eq!(manifest[0].key.session, "ses-1");
    assert_eq!(manifest[1].key.session, "ses-2");
}

#[test]
fn subject_scope_emits_one_task_per_subject() {
    let rows = vec![row("sub-0001", "ses-1"), row("sub-0001", "ses-2")];
    let manifest = build(&rows);

    let recon: Vec<&ManifestRow> = manifest
        .iter()
        .filter(|r| r.procedure == "freesurfer")
        .collect();
    assert_eq!(recon.len(), 1);
    assert_eq!(recon[0].key.subject, "sub-0001");
    assert_eq!(recon[0].key.session, "");
    assert!(recon[0].key.dicom_path.as_os_str().is_empty());
}

#[test]
fn empty_discovery_builds_an_empty_manifest() {
    assert!(build(&[]).is_empty());
}

#[test]
fn in_flight_rows_filter_matching_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = StateStore::open(&dir.path().join("state.nq")).unwrap();
    store.push(StateRow {
        subject: "sub-0001".into(),
        session: "ses-1".into(),
        procedure: "bids".into(),
        status: TaskStatus::Running,
        submitted_at: DateTime::<Utc>::UNIX_EPOCH,
        job_id: "42".into(),
    });

    let manifest = build(&[row("sub-0001", "ses-1")]);
    let filtered = filter_in_flight(manifest, &store);

    assert!(filtered.iter().all(|r| r.procedure != "bids"));
    // The subject-scoped task has no in-flight row and survives.
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].procedure, "freesurfer");
}

#[test]
fn subject_scoped_tasks_match_rows_with_empty_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = StateStore::open(&dir.path().join("state.nq")).unwrap();
    store.push(StateRow {
        subject: "sub-0001".into(),
        session: String::new(),
        procedure: "freesurfer".into(),
        status: TaskStatus::Pending,
        submitted_at: DateTime::<Utc>::UNIX_EPOCH,
        job_id: "42".into(),
    });

    let filtered = filter_in_flight(build(&[row("sub-0001", "ses-1")]), &store);
    assert!(filtered.iter().all(|r| r.procedure != "freesurfer"));
}

#[yare::parameterized(
    complete = { TaskStatus::Complete },
    failed   = { TaskStatus::Failed },
)]
fn historical_rows_do_not_filter(status: TaskStatus) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = StateStore::open(&dir.path().join("state.nq")).unwrap();
    store.push(StateRow {
        subject: "sub-0001".into(),
        session: "ses-1".into(),
        procedure: "bids".into(),
        status,
        submitted_at: DateTime::<Utc>::UNIX_EPOCH,
        job_id: "42".into(),
    });

    let filtered = filter_in_flight(build(&[row("sub-0001", "ses-1")]), &store);
    assert!(filtered.iter().any(|r| r.procedure == "bids"));
}

#[test]
fn rebuilding_is_deterministic() {
    let rows = vec![row("sub-0002", "ses-1"), row("sub-0001", "ses-1")];
    assert_eq!(build(&rows), build(&rows));
}
