// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver-swap supervision (§4.4): a per-slot tick loop that waits for a new
//! driver, waits for that driver's first position update, then counts down a
//! mandatory-stop window, disqualifying or penalizing early departures.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::collab::ProcessHandle;
use crate::model::{CarId, CarModel, DriverGuid, Vec3};
use crate::registry::DriverRegistry;
use crate::session::SessionController;

const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    WaitingForNewDriver,
    AwaitingFirstPosition,
    CountingDown,
}

struct SwapState {
    phase: SwapPhase,
    new_identity: Option<DriverGuid>,
    total_time: Duration,
}

/// Durations configuring the mandatory-stop window (§4.4, ServerConfig).
#[derive(Debug, Clone, Copy)]
pub struct SwapParams {
    pub complete_time: Duration,
    pub disqualify_window: Duration,
    pub penalty_window: Duration,
}

/// Spawn the swap supervisor for a slot that just lost its driver. Runs
/// until the new driver leaves the pits cleanly, is disqualified, is
/// penalized, or the original driver reconnects (`cancel` is also honored,
/// e.g. on session end).
#[allow(clippy::too_many_arguments)]
pub fn spawn_swap_supervisor(
    registry: Arc<DriverRegistry>,
    process: Arc<dyn ProcessHandle>,
    session: Arc<SessionController>,
    slot: CarId,
    original_identity: DriverGuid,
    captured_pos: Vec3,
    params: SwapParams,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        info!(slot = slot.0, identity = %original_identity, "driver-swap supervision started");
        let mut interval = tokio::time::interval(TICK_PERIOD);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut state = SwapState {
            phase: SwapPhase::WaitingForNewDriver,
            new_identity: None,
            total_time: Duration::ZERO,
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(slot = slot.0, "driver-swap supervision canceled");
                    break;
                }
                _ = interval.tick() => {}
            }

            match state.phase {
                SwapPhase::WaitingForNewDriver => {
                    let Some(current) = registry.resolve_slot(slot).await else {
                        continue;
                    };
                    if current == original_identity {
                        info!(slot = slot.0, "original driver reconnected, aborting swap supervision");
                        break;
                    }
                    // §4.4: a different identity with nonzero loadedTime, not
                    // merely a different identity occupying the slot.
                    let loaded = registry
                        .with_connected_mut(&current, |record| record.loaded_time_millis.is_some())
                        .await
                        .unwrap_or(false);
                    if !loaded {
                        continue;
                    }
                    state.new_identity = Some(current);
                    state.phase = SwapPhase::AwaitingFirstPosition;
                }

                SwapPhase::AwaitingFirstPosition => {
                    let Some(ref new_identity) = state.new_identity else { continue };
                    let Some(current) = registry.resolve_slot(slot).await else {
                        state.phase = SwapPhase::WaitingForNewDriver;
                        state.new_identity = None;
                        continue;
                    };
                    if current != *new_identity {
                        state.new_identity = Some(current);
                        continue;
                    }

                    let has_position = registry
                        .with_connected_mut(new_identity, |record| !record.last_pos.is_zero())
                        .await
                        .unwrap_or(false);

                    if has_position {
                        state.phase = SwapPhase::CountingDown;
                        let _ = process
                            .send_chat(
                                slot,
                                &format!(
                                    "wait {} before leaving pits",
                                    format_duration(params.complete_time)
                                ),
                            )
                            .await;
                    }
                }

                SwapPhase::CountingDown => {
                    let Some(ref new_identity) = state.new_identity else { continue };

                    state.total_time += TICK_PERIOD;
                    let countdown = params.complete_time.saturating_sub(state.total_time);

                    if countdown.is_zero() {
                        let _ = process.send_chat(slot, "clear to leave the pits").await;
                        info!(slot = slot.0, "driver-swap mandatory stop completed");
                        break;
                    }

                    let moved = registry
                        .with_connected_mut(new_identity, |record| {
                            record.last_pos.max_axis_delta(&captured_pos)
                        })
                        .await
                        .unwrap_or(0.0);

                    if moved > 10.0 {
                        if countdown >= params.disqualify_window {
                            let _ = process
                                .send_chat(slot, "left pits too early, disqualifying")
                                .await;
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            let _ = process.kick(slot).await;
                            // Intentionally does not break: the original
                            // implementation keeps ticking after a kick.
                        } else if countdown >= params.penalty_window {
                            let penalty_seconds =
                                (countdown + Duration::from_secs(5)).as_secs_f64();
                            let model = registry
                                .with_connected_mut(new_identity, |r| r.current_car.clone())
                                .await
                                .unwrap_or_else(|| CarModel(String::new()));
                            session
                                .record_penalty(new_identity.clone(), model, penalty_seconds)
                                .await;
                            let _ = process
                                .send_chat(slot, &format!("penalized {penalty_seconds:.0}s for leaving early"))
                                .await;
                            info!(slot = slot.0, seconds = penalty_seconds, "driver-swap penalty recorded");
                            break;
                        }
                    } else {
                        let _ = process
                            .send_chat(
                                slot,
                                &format!("free to leave in {}", format_duration(countdown)),
                            )
                            .await;
                    }
                }
            }
        }
    });
}

fn format_duration(d: Duration) -> String {
    format!("{}s", d.as_secs())
}

#[cfg(test)]
#[path = "swap_tests.rs"]
mod tests;
