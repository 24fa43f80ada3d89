// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness detection and speed tracking (§4.4). Swap supervision lives in
//! [`swap`].

pub mod swap;

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::model::{DriverGuid, DriverRecord, Vec3};

/// Update-miss counters, one per identity currently tracked. A counter
/// exceeding `5 × |connected|` flags that identity for disconnection
/// (§4.4, invariant P7).
pub struct LivenessTracker {
    counters: RwLock<HashMap<DriverGuid, u32>>,
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self { counters: RwLock::new(HashMap::new()) }
    }

    /// Increment every tracked counter, reset the updating driver's counter
    /// to zero, and return the identities whose counter now exceeds the
    /// threshold. Mutation of the registry (disconnecting those drivers)
    /// must happen after this call returns (collect-then-mutate, §5).
    pub async fn on_car_update(&self, updater: &DriverGuid, connected_count: usize) -> Vec<DriverGuid> {
        let threshold = 5 * connected_count as u32;
        let mut counters = self.counters.write().await;

        counters.entry(updater.clone()).or_insert(0);
        for (identity, count) in counters.iter_mut() {
            if identity == updater {
                *count = 0;
            } else {
                *count += 1;
            }
        }

        counters
            .iter()
            .filter(|(_, &count)| count > threshold)
            .map(|(identity, _)| identity.clone())
            .collect()
    }

    /// Drop the liveness counter for an identity that disconnected.
    pub async fn clear(&self, identity: &DriverGuid) {
        self.counters.write().await.remove(identity);
    }

    /// Ensure a freshly-connected identity has a counter entry so it starts
    /// accruing misses immediately, rather than only once it first updates.
    pub async fn ensure(&self, identity: &DriverGuid) {
        self.counters.write().await.entry(identity.clone()).or_insert(0);
    }

    /// Clear all counters (§4.3 new-session: "Reset liveness counters").
    pub async fn reset_all(&self) {
        self.counters.write().await.clear();
    }
}

/// §4.4 speed tracking: update `topSpeedThisLap`, `lastSeen`, `lastPos`.
pub fn apply_car_update(record: &mut DriverRecord, velocity: Vec3, pos: Vec3, now_millis: i64) {
    let speed_ms = (velocity.x * velocity.x + velocity.z * velocity.z).sqrt();
    let speed_kmh = speed_ms * 3.6;

    let stats = record.current_stats_mut();
    if speed_kmh > stats.top_speed_this_lap {
        stats.top_speed_this_lap = speed_kmh;
    }
    record.last_seen_millis = Some(now_millis);
    record.last_pos = pos;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
