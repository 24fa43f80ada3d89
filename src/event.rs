// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound decoded events and outbound broadcast messages (§6).

use serde::{Deserialize, Serialize};

use crate::model::{CarId, DriverGuid, RaceControlSnapshot, Vec3};

/// One decoded event from the UDP codec collaborator. The codec itself is
/// out of scope; this is the typed boundary the Dispatcher consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Version { number: u32 },
    SessionInfo(SessionInfoPayload),
    EndSession { result_filepath: String },
    CarUpdate { slot: CarId, velocity: Vec3, pos: Vec3 },
    SessionCarInfo {
        slot: CarId,
        identity: DriverGuid,
        raw_name: String,
        car_model: String,
        kind: SessionCarInfoKind,
    },
    ClientLoaded { slot: CarId },
    CollisionWithCar { slot: CarId, other_slot: CarId, impact_speed_kmh: f32 },
    CollisionWithEnvironment { slot: CarId, impact_speed_kmh: f32 },
    LapCompleted { slot: CarId, lap_time_ms: u32, cuts: u32 },
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCarInfoKind {
    NewConnection,
    ConnectionClosed,
}

/// Session-info payload, distinguishing new-session from an in-place update
/// the way the server decoder reports it (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfoPayload {
    pub is_new_session: bool,
    pub kind: crate::model::SessionKind,
    pub track: String,
    pub track_layout: String,
    pub name: String,
    pub elapsed_ms: u64,
    pub ambient_temp: f32,
    pub road_temp: f32,
    pub weather_graphic: String,
}

/// Messages sent to the broadcast fan-out collaborator (§6).
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// The full race-control snapshot, masquerading as transport event 200
    /// (Design Notes §9).
    Snapshot(RaceControlSnapshot),
    /// Every inbound event, forwarded verbatim after its handler completes.
    Forwarded(Event),
}

/// Transport event code used when broadcasting a snapshot.
pub const SNAPSHOT_EVENT_CODE: u32 = 200;
