// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timing & Scoring (§4.5): lap accumulation, best-lap tracking, gap/split
//! computation, and collision recording.

use std::time::Duration;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::model::{CarId, Collision, CollisionKind, DriverGuid, DriverRecord, SessionKind};
use crate::registry::DriverRegistry;

/// §4.5 Lap completed: accumulate stats, update best lap, reset top speed,
/// re-sort, and recompute every connected driver's split.
pub async fn record_lap_completed(
    registry: &DriverRegistry,
    clock: &dyn Clock,
    kind: SessionKind,
    slot: CarId,
    lap_time_ms: u32,
    cuts: u32,
) -> Result<(), CoreError> {
    let identity = registry.resolve_slot(slot).await.ok_or(CoreError::UnknownSlot)?;
    let now = clock.now_millis();
    let lap_duration = Duration::from_millis(u64::from(lap_time_ms));

    registry
        .with_connected_mut(&identity, |record| {
            record.total_num_laps += 1;
            let stats = record.current_stats_mut();
            stats.num_laps += 1;
            stats.total_lap_time += lap_duration;
            stats.last_lap = lap_duration;
            stats.last_lap_completed_time_millis = now;

            if cuts == 0 && (stats.best_lap.is_zero() || lap_duration < stats.best_lap) {
                stats.best_lap = lap_duration;
                stats.top_speed_best_lap = stats.top_speed_this_lap;
            }
            stats.top_speed_this_lap = 0.0;
        })
        .await
        .ok_or(CoreError::UnknownDriver)?;

    registry.sort(kind).await;
    compute_splits(registry, kind).await;

    Ok(())
}

/// §4.5 split/gap, recomputed for every connected driver after a sort.
/// Valid only immediately after the sort that produced `position`
/// (invariant 6).
pub async fn compute_splits(registry: &DriverRegistry, kind: SessionKind) {
    let mut ordered: Vec<DriverRecord> = registry.connected_snapshot().await.into_values().collect();
    ordered.sort_by_key(|record| record.position);

    let splits = match kind {
        SessionKind::Race => race_splits(&ordered),
        SessionKind::Practice | SessionKind::Qualify => non_race_splits(&ordered),
    };

    for (identity, split) in splits {
        registry.with_connected_mut(&identity, |record| record.split = split).await;
    }
}

fn race_splits(ordered: &[DriverRecord]) -> Vec<(DriverGuid, String)> {
    ordered
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let split = if i == 0 {
                "0s".to_owned()
            } else {
                let ahead = &ordered[i - 1];
                let ahead_laps = ahead.current_stats().num_laps as i64;
                let self_laps = record.current_stats().num_laps as i64;
                let delta = ahead_laps - self_laps;
                if delta <= 0 {
                    let gap = record
                        .current_stats()
                        .total_lap_time
                        .saturating_sub(ahead.current_stats().total_lap_time);
                    format!("{}ms", gap.as_millis())
                } else if delta == 1 {
                    "1 lap".to_owned()
                } else {
                    format!("{delta} laps")
                }
            };
            (record.identity.clone(), split)
        })
        .collect()
}

fn non_race_splits(ordered: &[DriverRecord]) -> Vec<(DriverGuid, String)> {
    ordered
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let split = if i == 0 {
                "0s".to_owned()
            } else {
                let prev = &ordered[i - 1];
                let best = record.current_stats().best_lap;
                let prev_best = prev.current_stats().best_lap;
                if best != Duration::ZERO && best >= prev_best {
                    format!("{}ms", best.saturating_sub(prev_best).as_millis())
                } else {
                    String::new()
                }
            };
            (record.identity.clone(), split)
        })
        .collect()
}

/// §4.5 collision-with-car: resolve the other party by slot when possible.
pub async fn record_collision_with_car(
    registry: &DriverRegistry,
    clock: &dyn Clock,
    slot: CarId,
    other_slot: CarId,
    impact_speed_kmh: f32,
) -> Result<(), CoreError> {
    let identity = registry.resolve_slot(slot).await.ok_or(CoreError::UnknownSlot)?;
    let other_identity = registry.resolve_slot(other_slot).await;

    let other_display_name = match &other_identity {
        Some(other) => registry.with_connected_mut(other, |r| r.car_info.display_name.clone()).await,
        None => None,
    };

    let collision = Collision {
        id: Uuid::new_v4(),
        kind: CollisionKind::WithCar,
        timestamp_millis: clock.now_millis(),
        impact_speed_kmh,
        other_identity,
        other_display_name,
    };

    registry
        .with_connected_mut(&identity, |record| record.collisions.push(collision))
        .await
        .ok_or(CoreError::UnknownDriver)?;
    Ok(())
}

/// §4.5 collision-with-environment: no other party to resolve.
pub async fn record_collision_with_environment(
    registry: &DriverRegistry,
    clock: &dyn Clock,
    slot: CarId,
    impact_speed_kmh: f32,
) -> Result<(), CoreError> {
    let identity = registry.resolve_slot(slot).await.ok_or(CoreError::UnknownSlot)?;

    let collision = Collision {
        id: Uuid::new_v4(),
        kind: CollisionKind::WithEnvironment,
        timestamp_millis: clock.now_millis(),
        impact_speed_kmh,
        other_identity: None,
        other_display_name: None,
    };

    registry
        .with_connected_mut(&identity, |record| record.collisions.push(collision))
        .await
        .ok_or(CoreError::UnknownDriver)?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
