// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single injected time source (Design Notes §9: "all `now` calls are a
//! single monotonic time source injected at construction").

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Abstracts over wall-clock time so lifecycle timestamps are deterministic
/// under test. Tick/elapsed-time math for long-running tasks goes through
/// `tokio::time` (interval ticking, `start_paused` in tests) rather than
/// this trait — there is only one source of `now` for the values that get
/// serialized, and it is this one.
pub trait Clock: Send + Sync {
    /// Wall-clock milliseconds since the Unix epoch, used for timestamps
    /// that get serialized into the snapshot.
    fn now_millis(&self) -> i64;
}

/// Production clock backed by the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

/// Deterministic clock for tests: starts at a fixed epoch and only advances
/// when told to.
pub struct FakeClock {
    offset_ms: AtomicI64,
    base_millis: i64,
}

impl FakeClock {
    pub fn new(base_millis: i64) -> Self {
        Self { offset_ms: AtomicI64::new(0), base_millis }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> i64 {
        self.base_millis + self.offset_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
