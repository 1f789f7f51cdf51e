// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nq-engine: the scheduling core.
//!
//! One pass runs Discover → Monitor → Reconcile → Manifest → in-flight
//! filter → Submit → Persist, sequentially, under the state store's
//! advisory lock. Per-task failures stay local; persistence failures
//! abort the pass.

pub mod discover;
pub mod error;
pub mod manifest;
pub mod monitor;
pub mod oracle;
pub mod pass;
pub mod reconcile;
pub mod retry;
pub mod rules;
pub mod submit;

pub use discover::{DiscoverRow, OutputProbe};
pub use error::EngineError;
pub use manifest::ManifestRow;
pub use oracle::OracleCtx;
pub use pass::{PassOptions, PassReport};
pub use rules::RuleOptions;
pub use submit::SubmitOutcome;
