// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver presentation order (§4.2 sort policy). `sort` is invoked
//! explicitly after lap-completed; position/split are valid only
//! immediately after a sort (invariant 6).

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{DriverGuid, DriverRecord, SessionKind};

/// Sort the connected group and write back 1-indexed `position`.
pub fn sort_connected(map: &mut HashMap<DriverGuid, DriverRecord>, kind: SessionKind) {
    let mut order: Vec<DriverGuid> = map.keys().cloned().collect();
    match kind {
        SessionKind::Race => order.sort_by(|a, b| race_connected_cmp(&map[a], &map[b])),
        SessionKind::Practice | SessionKind::Qualify => {
            order.sort_by(|a, b| non_race_cmp(&map[a], &map[b]))
        }
    }
    assign_positions(map, &order);
}

/// Sort the disconnected group and write back 1-indexed `position`.
pub fn sort_disconnected(map: &mut HashMap<DriverGuid, DriverRecord>, kind: SessionKind) {
    let mut order: Vec<DriverGuid> = map.keys().cloned().collect();
    match kind {
        SessionKind::Race => order.sort_by(|a, b| {
            let la = map[b].current_stats().last_lap_completed_time_millis;
            let lb = map[a].current_stats().last_lap_completed_time_millis;
            la.cmp(&lb)
        }),
        SessionKind::Practice | SessionKind::Qualify => {
            order.sort_by(|a, b| non_race_cmp(&map[a], &map[b]))
        }
    }
    assign_positions(map, &order);
}

fn assign_positions(map: &mut HashMap<DriverGuid, DriverRecord>, order: &[DriverGuid]) {
    for (idx, id) in order.iter().enumerate() {
        if let Some(record) = map.get_mut(id) {
            record.position = (idx + 1) as u32;
        }
    }
}

fn race_connected_cmp(a: &DriverRecord, b: &DriverRecord) -> Ordering {
    let (sa, sb) = (a.current_stats(), b.current_stats());
    sb.num_laps.cmp(&sa.num_laps).then_with(|| sa.total_lap_time.cmp(&sb.total_lap_time))
}

fn non_race_cmp(a: &DriverRecord, b: &DriverRecord) -> Ordering {
    let (sa, sb) = (a.current_stats(), b.current_stats());
    let (a_zero, b_zero) = (sa.best_lap.is_zero(), sb.best_lap.is_zero());
    match (a_zero, b_zero) {
        (true, true) => sb
            .num_laps
            .cmp(&sa.num_laps)
            .then_with(|| sa.last_lap_completed_time_millis.cmp(&sb.last_lap_completed_time_millis)),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => sa.best_lap.cmp(&sb.best_lap),
    }
}

#[cfg(test)]
#[path = "sort_tests.rs"]
mod tests;
