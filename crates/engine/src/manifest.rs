// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest construction and the in-flight filter.

use crate::discover::DiscoverRow;
use crate::rules::{self, RuleOptions};
use nq_core::{Procedure, Scope, StudyLayout, WorkKey};
use nq_storage::StateStore;
use std::collections::HashSet;

/// One task slated for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    pub key: WorkKey,
    pub procedure: String,
    /// Index of the procedure in the declared list; lower submits first.
    pub priority: usize,
}

/// Evaluate every rule over every discover row.
///
/// Subject-scoped procedures contribute at most one task per subject,
/// keyed by the subject alone (empty session, empty dicom path). Rows
/// come out sorted by `(priority, subject, session)`.
pub fn build_manifest(
    rows: &[DiscoverRow],
    procedures: &[Procedure],
    layout: &StudyLayout,
    options: &RuleOptions,
) -> Vec<ManifestRow> {
    let mut manifest = Vec::new();
    let mut subject_tasks: HashSet<(String, usize)> = HashSet::new();

    for row in rows {
        for (index, procedure) in procedures.iter().enumerate() {
            if !rules::requires_submission(row, index, procedures, layout, options) {
                continue;
            }
            let key = match procedure.scope {
                Scope::Session => row.key.clone(),
                Scope::Subject => {
                    if !subject_tasks.insert((row.key.subject.clone(), index)) {
                        continue;
                    }
                    WorkKey::new(row.key.subject.clone(), "", "")
                }
            };
            manifest.push(ManifestRow {
                key,
                procedure: procedure.name.clone(),
                priority: index,
            });
        }
    }

    manifest.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.key.subject.cmp(&b.key.subject))
            .then_with(|| a.key.session.cmp(&b.key.session))
    });
    manifest
}

/// Drop tasks that already have an in-flight state row.
///
/// Historical `complete` and `failed` rows never filter; re-queuing
/// those is the oracle's and retry's business.
pub fn filter_in_flight(manifest: Vec<ManifestRow>, store: &StateStore) -> Vec<ManifestRow> {
    manifest
        .into_iter()
        .filter(|row| !store.has_in_flight(&row.key.subject, &row.key.session, &row.procedure))
        .collect()
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
