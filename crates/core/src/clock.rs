// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Submission timestamps and audit records carry wall-clock UTC time, so
//! the clock hands out `DateTime<Utc>` rather than monotonic instants.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// A clock that provides the current UTC time.
pub trait Clock: Clone + Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        // Arbitrary fixed origin so tests are reproducible.
        Self {
            current: Arc::new(Mutex::new(
                DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_720_000_000),
            )),
        }
    }

    /// Advance the clock by the given delta.
    pub fn advance(&self, delta: TimeDelta) {
        *self.current.lock() += delta;
    }

    /// Set the clock to a specific time.
    pub fn set(&self, t: DateTime<Utc>) {
        *self.current.lock() = t;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
