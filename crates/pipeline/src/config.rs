// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration: one YAML document describing the study roots,
//! the batch options, and the ordered procedure list.
//!
//! Validation happens at load time; a bad configuration aborts before any
//! pass runs. Procedures must be declared after their dependencies, which
//! makes dependency cycles unrepresentable.

use nq_core::{CompletionMarker, Procedure, StudyLayout};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Audit log filename used when `log_file` is not configured.
const DEFAULT_AUDIT_LOG: &str = "scheduler_audit.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("procedure at position {index} has an empty name")]
    UnnamedProcedure { index: usize },
    #[error("duplicate procedure name: {0}")]
    DuplicateProcedure(String),
    #[error("procedure {procedure} depends on unknown procedure {dependency}")]
    UnknownDependency {
        procedure: String,
        dependency: String,
    },
    #[error(
        "procedure {procedure} depends on {dependency}, which is declared later; \
         dependencies must be declared first"
    )]
    ForwardDependency {
        procedure: String,
        dependency: String,
    },
    #[error("procedure {0} declares an empty completion marker list")]
    EmptyMarkerList(String),
}

/// The scheduler's entire configuration surface.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub dicom_root: PathBuf,
    pub bids_root: PathBuf,
    pub derivatives_root: PathBuf,
    /// Persisted state store.
    pub state_file: PathBuf,
    /// Audit log; defaults to [`DEFAULT_AUDIT_LOG`] next to `state_file`.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// When present, Discover reads this index instead of walking
    /// `dicom_root`.
    #[serde(default)]
    pub sessions_file: Option<PathBuf>,
    /// Empty means the partition flag is omitted from submissions.
    #[serde(default)]
    pub batch_partition: String,
    #[serde(default)]
    pub batch_account: String,
    #[serde(default)]
    pub batch_mem: Option<String>,
    #[serde(default)]
    pub batch_cpus: Option<u32>,
    /// When present, submissions carry stdout/stderr paths under this
    /// directory.
    #[serde(default)]
    pub batch_log_dir: Option<PathBuf>,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

impl PipelineConfig {
    /// Load and validate a configuration document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the procedure list invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let all: HashSet<&str> = self.procedures.iter().map(|p| p.name.as_str()).collect();

        for (index, proc) in self.procedures.iter().enumerate() {
            if proc.name.is_empty() {
                return Err(ConfigError::UnnamedProcedure { index });
            }
            if !seen.insert(proc.name.as_str()) {
                return Err(ConfigError::DuplicateProcedure(proc.name.clone()));
            }
            for dep in &proc.depends_on {
                if !self.procedures[..index].iter().any(|p| &p.name == dep) {
                    // Distinguish a typo from an ordering (or cycle) problem.
                    return Err(if all.contains(dep.as_str()) {
                        ConfigError::ForwardDependency {
                            procedure: proc.name.clone(),
                            dependency: dep.clone(),
                        }
                    } else {
                        ConfigError::UnknownDependency {
                            procedure: proc.name.clone(),
                            dependency: dep.clone(),
                        }
                    });
                }
            }
            if let Some(CompletionMarker::All(patterns)) = &proc.completion_marker {
                if patterns.is_empty() {
                    return Err(ConfigError::EmptyMarkerList(proc.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// The three path roots as a [`StudyLayout`].
    pub fn layout(&self) -> StudyLayout {
        StudyLayout {
            dicom_root: self.dicom_root.clone(),
            bids_root: self.bids_root.clone(),
            derivatives_root: self.derivatives_root.clone(),
        }
    }

    /// Resolved audit log path.
    pub fn audit_log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(path) => path.clone(),
            None => self
                .state_file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_AUDIT_LOG),
        }
    }

    /// Look up a procedure by name.
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
