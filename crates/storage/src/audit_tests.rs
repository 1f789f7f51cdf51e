// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{DateTime, Utc};
use nq_core::EventKind;

fn event(subject: &str) -> AuditEvent {
    AuditEvent::submitted(
        DateTime::<Utc>::UNIX_EPOCH,
        subject,
        "ses-202407110849",
        "bids",
        "42",
    )
}

#[test]
fn appends_in_event_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    log.append(&event("sub-0001")).unwrap();
    log.append(&event("sub-0002")).unwrap();

    let events = log.read_all().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subject.as_deref(), Some("sub-0001"));
    assert_eq!(events[1].subject.as_deref(), Some("sub-0002"));
}

#[test]
fn records_are_newline_delimited_json() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    log.append(&event("sub-0001")).unwrap();

    let raw = std::fs::read_to_string(log.path()).unwrap();
    assert!(raw.ends_with('\n'));
    assert_eq!(raw.lines().count(), 1);
    let parsed: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
    assert_eq!(parsed["event"], "submitted");
    assert!(parsed["timestamp"].is_string());
}

#[test]
fn missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    assert_eq!(log.read_all().unwrap(), Vec::new());
}

#[test]
fn open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("nested/deeper/audit.jsonl")).unwrap();
    log.append(&event("sub-0001")).unwrap();
    assert!(log.path().exists());
}

#[test]
fn corrupt_line_is_reported_with_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let log = AuditLog::open(&path).unwrap();
    log.append(&event("sub-0001")).unwrap();
    std::fs::write(
        &path,
        format!("{}not json\n", std::fs::read_to_string(&path).unwrap()),
    )
    .unwrap();

    let err = log.read_all().unwrap_err();
    assert!(matches!(err, AuditError::Corrupt { line: 2, .. }));
}

#[test]
fn kinds_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    let retry = AuditEvent::retry_cleared(
        DateTime::<Utc>::UNIX_EPOCH,
        &nq_core::StateRow {
            subject: "sub-0003".into(),
            session: "ses-1".into(),
            procedure: "bids".into(),
            status: nq_core::TaskStatus::Failed,
            submitted_at: DateTime::<Utc>::UNIX_EPOCH,
            job_id: "42".into(),
        },
    );
    log.append(&retry).unwrap();
    let events = log.read_all().unwrap();
    assert_eq!(events[0].event, EventKind::RetryCleared);
    assert_eq!(events[0].old_status, Some(nq_core::TaskStatus::Failed));
}
