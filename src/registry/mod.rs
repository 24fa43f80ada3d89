// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver Registry (§4.2): two ordered maps (connected, disconnected) keyed
//! by driver identity, plus a car-slot → identity auxiliary index.

pub mod name;
pub mod sort;
pub mod wrap;

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{
    CarId, CarInfo, CarModel, DriverGuid, DriverRecord, PerCarStats, RaceControlSnapshot,
    SessionKind, SessionState, Vec3,
};

/// Outcome of a disconnect, used by the caller to decide whether to launch
/// driver-swap supervision (§4.4) — the Registry itself never spawns tasks.
pub struct DisconnectOutcome {
    pub slot: CarId,
    pub retained: bool,
    pub last_pos: Vec3,
}

/// The driver registry. Each map embeds its own lock (§5); iteration always
/// happens under a read lock and mutation is applied after (collect-then-
/// mutate, §5/§9).
pub struct DriverRegistry {
    connected: RwLock<HashMap<DriverGuid, DriverRecord>>,
    disconnected: RwLock<HashMap<DriverGuid, DriverRecord>>,
    slot_index: RwLock<HashMap<CarId, DriverGuid>>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            connected: RwLock::new(HashMap::new()),
            disconnected: RwLock::new(HashMap::new()),
            slot_index: RwLock::new(HashMap::new()),
        }
    }

    /// §4.2 Connect.
    pub async fn connect(
        &self,
        slot: CarId,
        identity: DriverGuid,
        raw_name: &str,
        car_model: &str,
        now_millis: i64,
    ) {
        let display_name = name::normalize_display_name(raw_name);
        let initials = name::derive_initials(&display_name);
        let model = CarModel(car_model.to_owned());

        self.slot_index.write().await.insert(slot, identity.clone());

        let mut record = {
            let mut disconnected = self.disconnected.write().await;
            disconnected.remove(&identity)
        };

        if let Some(ref mut r) = record {
            debug!(identity = %identity, "promoting disconnected driver to connected");
            r.car_info = CarInfo {
                slot,
                display_name: display_name.clone(),
                initials: initials.clone(),
                car_model: model.clone(),
            };
        }

        let mut record = record.unwrap_or_else(|| DriverRecord {
            identity: identity.clone(),
            car_info: CarInfo {
                slot,
                display_name: display_name.clone(),
                initials: initials.clone(),
                car_model: model.clone(),
            },
            cars: HashMap::new(),
            current_car: model.clone(),
            total_num_laps: 0,
            position: 0,
            split: String::new(),
            connected_time_millis: None,
            loaded_time_millis: None,
            last_seen_millis: None,
            last_pos: Vec3::default(),
            collisions: Vec::new(),
        });

        record.current_car = model.clone();
        record.cars.entry(model).or_insert_with(PerCarStats::default);
        record.connected_time_millis = Some(now_millis);
        record.current_stats_mut().last_lap_completed_time_millis = now_millis;

        self.connected.write().await.insert(identity, record);
    }

    /// §4.2 Disconnect (registry-internal part only). The caller is
    /// responsible for clearing the liveness counter and launching swap
    /// supervision based on the returned outcome.
    pub async fn record_disconnect(
        &self,
        identity: &DriverGuid,
    ) -> Result<DisconnectOutcome, CoreError> {
        let mut connected = self.connected.write().await;
        let mut record = connected.remove(identity).ok_or(CoreError::UnknownDriver)?;
        drop(connected);

        record.loaded_time_millis = None;
        let slot = record.car_info.slot;
        let last_pos = record.last_pos;
        let retained = record.total_num_laps > 0;

        self.slot_index.write().await.remove(&slot);

        if retained {
            self.disconnected.write().await.insert(identity.clone(), record);
        } else {
            debug!(identity = %identity, "dropping driver with zero laps on disconnect");
        }

        Ok(DisconnectOutcome { slot, retained, last_pos })
    }

    /// §4.2 Loaded. Returns the fully-assembled (unwrapped) welcome chat
    /// text for the caller to word-wrap and send.
    pub async fn mark_loaded(&self, slot: CarId, now_millis: i64) -> Result<DriverGuid, CoreError> {
        let identity = self.slot_index.read().await.get(&slot).cloned().ok_or(CoreError::UnknownSlot)?;
        let mut connected = self.connected.write().await;
        let record = connected.get_mut(&identity).ok_or(CoreError::UnknownSlot)?;
        record.loaded_time_millis = Some(now_millis);
        Ok(identity)
    }

    pub async fn resolve_slot(&self, slot: CarId) -> Option<DriverGuid> {
        self.slot_index.read().await.get(&slot).cloned()
    }

    pub async fn identity_connected(&self, identity: &DriverGuid) -> bool {
        self.connected.read().await.contains_key(identity)
    }

    /// Sort both groups per the session-type policy (§4.2). Valid only until
    /// the next mutation (invariant 6).
    pub async fn sort(&self, kind: SessionKind) {
        sort::sort_connected(&mut self.connected.write().await, kind);
        sort::sort_disconnected(&mut self.disconnected.write().await, kind);
    }

    pub async fn with_connected_mut<F, R>(&self, identity: &DriverGuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut DriverRecord) -> R,
    {
        let mut connected = self.connected.write().await;
        connected.get_mut(identity).map(f)
    }

    pub async fn connected_snapshot(&self) -> HashMap<DriverGuid, DriverRecord> {
        self.connected.read().await.clone()
    }

    pub async fn connected_count(&self) -> usize {
        self.connected.read().await.len()
    }

    pub async fn connected_identities(&self) -> Vec<DriverGuid> {
        self.connected.read().await.keys().cloned().collect()
    }

    /// Disconnect every currently-connected driver (liveness poller `done`
    /// signal, §4.4), returning the identities removed. The caller still
    /// owns clearing liveness counters / persistence / broadcast.
    pub async fn disconnect_all_connected(&self) -> Vec<DriverGuid> {
        let identities = self.connected_identities().await;
        let mut removed = Vec::with_capacity(identities.len());
        for identity in identities {
            if self.record_disconnect(&identity).await.is_ok() {
                removed.push(identity);
            }
        }
        removed
    }

    /// §4.3 new-session: empty car info in place for connected drivers,
    /// drop all disconnected drivers.
    pub async fn empty_for_new_session(&self, now_millis: i64) {
        let mut connected = self.connected.write().await;
        for record in connected.values_mut() {
            record.reset_for_new_session(now_millis);
        }
        drop(connected);
        self.disconnected.write().await.clear();
        info!("session reset: car info emptied, disconnected drivers dropped");
    }

    /// §4.3 new-session: non-emptying path still resets each connected
    /// driver's current-car lap-completed timestamp.
    pub async fn touch_lap_completed_timestamps(&self, now_millis: i64) {
        let mut connected = self.connected.write().await;
        for record in connected.values_mut() {
            record.current_stats_mut().last_lap_completed_time_millis = now_millis;
        }
    }

    /// §4.3 new-session: merge persisted drivers into disconnected, skipping
    /// identities already present in either map.
    pub async fn merge_persisted(&self, persisted: HashMap<DriverGuid, DriverRecord>) {
        let connected = self.connected.read().await;
        let mut disconnected = self.disconnected.write().await;
        for (identity, record) in persisted {
            if connected.contains_key(&identity) || disconnected.contains_key(&identity) {
                continue;
            }
            disconnected.insert(identity, record);
        }
    }

    /// §4.5 snapshot: union of connected and disconnected, connected wins.
    pub async fn snapshot(&self, session: SessionState) -> RaceControlSnapshot {
        let mut drivers = self.disconnected.read().await.clone();
        drivers.extend(self.connected.read().await.clone());
        RaceControlSnapshot { session, drivers }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
