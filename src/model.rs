// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core data model (§3). Driver identity is always resolved through
//! [`DriverGuid`]; [`CarId`] (car slot) is an auxiliary index only.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque stable identity for a human driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverGuid(pub String);

impl std::fmt::Display for DriverGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric car slot, reused across sessions and reassigned on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarId(pub u32);

/// Car model key, e.g. "ks_porsche_911_gt3_r".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarModel(pub String);

/// 3-D position or velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Manhattan-∞ distance: the largest single-axis displacement.
    pub fn max_axis_delta(&self, other: &Vec3) -> f32 {
        (self.x - other.x).abs().max((self.y - other.y).abs()).max((self.z - other.z).abs())
    }
}

/// Current slot assignment and display identity for a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarInfo {
    pub slot: CarId,
    pub display_name: String,
    pub initials: String,
    pub car_model: CarModel,
}

/// Per-car lap statistics (§3 `cars` map value).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerCarStats {
    pub total_lap_time: Duration,
    pub last_lap: Duration,
    pub num_laps: u32,
    /// Minimum clean lap duration observed, or zero if none (invariant 5).
    pub best_lap: Duration,
    pub top_speed_this_lap: f32,
    pub top_speed_best_lap: f32,
    pub last_lap_completed_time_millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionKind {
    WithCar,
    WithEnvironment,
}

/// Append-only collision record (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collision {
    pub id: uuid::Uuid,
    pub kind: CollisionKind,
    pub timestamp_millis: i64,
    pub impact_speed_kmh: f32,
    pub other_identity: Option<DriverGuid>,
    pub other_display_name: Option<String>,
}

/// Full per-identity driver record (§3 invariant: exactly one of
/// {connected, disconnected, neither}).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverRecord {
    pub identity: DriverGuid,
    pub car_info: CarInfo,
    pub cars: HashMap<CarModel, PerCarStats>,
    pub current_car: CarModel,
    pub total_num_laps: u32,
    pub position: u32,
    pub split: String,
    pub connected_time_millis: Option<i64>,
    pub loaded_time_millis: Option<i64>,
    pub last_seen_millis: Option<i64>,
    pub last_pos: Vec3,
    pub collisions: Vec<Collision>,
}

impl DriverRecord {
    /// Current car's stats, creating an empty entry if this is the first
    /// time `current_car` is seen (invariant 4: `currentCar` always points
    /// to a present key in `cars`).
    pub fn current_stats(&self) -> &PerCarStats {
        self.cars.get(&self.current_car).expect("current_car must be present in cars")
    }

    pub fn current_stats_mut(&mut self) -> &mut PerCarStats {
        self.cars.entry(self.current_car.clone()).or_default()
    }

    /// Reset per-session stats in place, keeping identity and car info
    /// (used when emptying car info across a new-session transition).
    pub fn reset_for_new_session(&mut self, now_millis: i64) {
        self.cars.clear();
        self.cars.insert(self.current_car.clone(), PerCarStats::default());
        self.total_num_laps = 0;
        self.position = 0;
        self.split.clear();
        self.collisions.clear();
        self.current_stats_mut().last_lap_completed_time_millis = now_millis;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    Practice,
    Qualify,
    Race,
}

/// Session metadata (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub kind: SessionKind,
    pub track: String,
    pub track_layout: String,
    pub name: String,
    pub elapsed_ms: u64,
    pub ambient_temp: f32,
    pub road_temp: f32,
    pub weather_graphic: String,
    pub start_wall_clock_millis: i64,
}

impl SessionState {
    /// Whether `other` shares the four identifiers {type, track, layout, name}.
    pub fn same_identity(&self, other: &SessionState) -> bool {
        self.kind == other.kind
            && self.track == other.track
            && self.track_layout == other.track_layout
            && self.name == other.name
    }
}

/// Serializable snapshot for persistence and broadcast (§4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceControlSnapshot {
    pub session: SessionState,
    /// Union of connected and disconnected; connected wins on collision.
    pub drivers: HashMap<DriverGuid, DriverRecord>,
}
