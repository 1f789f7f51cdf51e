// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule evaluation: which `(work key, procedure)` pairs need submission.

use crate::discover::DiscoverRow;
use crate::oracle::{self, OracleCtx};
use nq_core::{Procedure, StudyLayout};

/// Pass-level toggles that modulate rule evaluation.
#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    /// Re-queue even when the procedure's own output is complete.
    pub force: bool,
    /// Restrict `force` to a single procedure.
    pub only: Option<String>,
}

impl RuleOptions {
    fn forces(&self, procedure: &Procedure) -> bool {
        self.force && self.only.as_deref().is_none_or(|name| name == procedure.name)
    }
}

/// True iff `procedures[index]` needs submission for `row`.
///
/// Dependencies are always checked against disk via the oracle, never
/// the state store, so forcing a downstream procedure cannot outrun its
/// upstream outputs.
pub fn requires_submission(
    row: &DiscoverRow,
    index: usize,
    procedures: &[Procedure],
    layout: &StudyLayout,
    options: &RuleOptions,
) -> bool {
    let Some(procedure) = procedures.get(index) else {
        return false;
    };
    if !row.dicom_exists {
        return false;
    }

    let ctx = OracleCtx {
        layout,
        subject: &row.key.subject,
        session: &row.key.session,
    };

    for dependency in &procedure.depends_on {
        let Some(dep_index) = procedures.iter().position(|p| &p.name == dependency) else {
            return false;
        };
        let Some(dep_procedure) = procedures.get(dep_index) else {
            return false;
        };
        let Some(probe) = row.outputs.get(dep_index) else {
            return false;
        };
        if !oracle::is_complete(dep_procedure, &probe.path, &ctx) {
            tracing::debug!(
                subject = %row.key.subject,
                procedure = %procedure.name,
                dependency = %dependency,
                "dependency incomplete"
            );
            return false;
        }
    }

    if options.forces(procedure) {
        return true;
    }
    let Some(probe) = row.outputs.get(index) else {
        return false;
    };
    !oracle::is_complete(procedure, &probe.path, &ctx)
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
