// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Controller (§4.3): current session metadata, new/update/end
//! transitions, and the periodic session-info poller's lifetime.

pub mod poller;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::collab::{Broadcast, LiveTimingStore, PenaltyService, ProcessHandle, TrackGateway};
use crate::event::SessionInfoPayload;
use crate::liveness::LivenessTracker;
use crate::model::{CarModel, DriverGuid, SessionKind, SessionState};
use crate::registry::DriverRegistry;

/// A penalty accumulated during driver-swap supervision, summed per
/// identity (§4.4, §9 "session-scoped map owned by the Session Controller").
#[derive(Debug, Clone)]
pub struct PendingPenalty {
    pub car_model: CarModel,
    pub seconds: f64,
}

/// Outcome of handling a session-info event, telling the Dispatcher whether
/// to broadcast (§4.1 routing table).
pub struct SessionEventOutcome {
    pub should_broadcast: bool,
}

pub struct SessionController {
    current: RwLock<Option<SessionState>>,
    prior: RwLock<Option<SessionState>>,
    penalties: RwLock<HashMap<DriverGuid, PendingPenalty>>,
    poller_cancel: RwLock<Option<CancellationToken>>,
    /// Cancellation handles for every swap supervisor active this session
    /// (§4.3 "cancel every active driver-swap supervisor" — session-scoped
    /// the same way the penalty accumulator is, rather than stashed on a
    /// driver record that may not exist yet when the task starts).
    swap_cancels: RwLock<Vec<CancellationToken>>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            prior: RwLock::new(None),
            penalties: RwLock::new(HashMap::new()),
            poller_cancel: RwLock::new(None),
            swap_cancels: RwLock::new(Vec::new()),
        }
    }

    /// Register a swap supervisor's cancellation handle so end-session (and
    /// a new looped session) can stop it regardless of what phase it is in.
    pub async fn register_swap_cancel(&self, cancel: CancellationToken) {
        self.swap_cancels.write().await.push(cancel);
    }

    pub async fn current(&self) -> Option<SessionState> {
        self.current.read().await.clone()
    }

    pub async fn record_penalty(&self, identity: DriverGuid, car_model: CarModel, seconds: f64) {
        let mut penalties = self.penalties.write().await;
        penalties
            .entry(identity)
            .and_modify(|p| p.seconds += seconds)
            .or_insert(PendingPenalty { car_model, seconds });
    }

    /// Snapshot of the pending-penalty accumulator, for tests asserting on
    /// swap-supervision output without driving a full end-session.
    #[cfg(test)]
    pub async fn drain_penalties_for_test(&self) -> HashMap<DriverGuid, PendingPenalty> {
        self.penalties.read().await.clone()
    }

    /// §4.3 New session.
    #[allow(clippy::too_many_arguments)]
    pub async fn handle_new_session(
        self: &Arc<Self>,
        payload: SessionInfoPayload,
        registry: &Arc<DriverRegistry>,
        liveness: &Arc<LivenessTracker>,
        track_gateway: &Arc<dyn TrackGateway>,
        store: &Arc<dyn LiveTimingStore>,
        process: &Arc<dyn ProcessHandle>,
        broadcast: &Arc<dyn Broadcast>,
        clock: &Arc<dyn Clock>,
    ) -> Result<(), crate::error::CoreError> {
        let now = clock.now_millis();

        let new_state = SessionState {
            kind: payload.kind,
            track: payload.track.clone(),
            track_layout: payload.track_layout.clone(),
            name: payload.name.clone(),
            elapsed_ms: payload.elapsed_ms,
            ambient_temp: payload.ambient_temp,
            road_temp: payload.road_temp,
            weather_graphic: payload.weather_graphic.clone(),
            start_wall_clock_millis: now,
        };

        let prior_state = self.current.read().await.clone();
        *self.prior.write().await = prior_state.clone();
        *self.current.write().await = Some(new_state.clone());

        // Reset liveness counters and the penalty accumulator (§4.3).
        liveness.reset_all().await;
        self.penalties.write().await.clear();

        // A new session invalidates any swap supervision from the one before it.
        for cancel in self.swap_cancels.write().await.drain(..) {
            cancel.cancel();
        }

        let preserve = new_state.kind == SessionKind::Practice
            && prior_state.as_ref().is_some_and(|p| p.same_identity(&new_state))
            && registry.connected_count().await > 0;

        if preserve {
            registry.touch_lap_completed_timestamps(now).await;
            info!("looped practice session: preserving connected drivers' stats");
        } else {
            registry.empty_for_new_session(now).await;
        }

        // Track info is fatal to new-session setup; track map is not.
        if let Err(e) = track_gateway.track_info(&new_state.track, &new_state.track_layout).await {
            warn!(err = %e, "track-info lookup failed, aborting new-session setup");
            return Err(crate::error::CoreError::GatewayUnavailable);
        }
        if let Err(e) = track_gateway.track_map(&new_state.track, &new_state.track_layout).await {
            warn!(err = %e, "track-map lookup failed, continuing without it");
        }

        // Launch (replacing) the periodic session-info poller.
        self.restart_poller(registry, liveness, process, broadcast).await;

        // Attempt to restore the persisted snapshot if identifiers match.
        match store.load().await {
            Ok(Some(snapshot)) if snapshot.session.same_identity(&new_state) => {
                registry.merge_persisted(snapshot.drivers).await;
            }
            Ok(_) => {}
            Err(e) => warn!(err = %e, "failed to load persisted live-timing data"),
        }

        Ok(())
    }

    /// §4.3 Session update: mutate ambient/road/weather/elapsed only,
    /// preserving session type. Broadcast iff ambient/road/weather changed.
    pub async fn handle_update(&self, payload: SessionInfoPayload) -> SessionEventOutcome {
        let mut current = self.current.write().await;
        let Some(state) = current.as_mut() else {
            return SessionEventOutcome { should_broadcast: false };
        };

        let changed = state.ambient_temp != payload.ambient_temp
            || state.road_temp != payload.road_temp
            || state.weather_graphic != payload.weather_graphic;

        state.ambient_temp = payload.ambient_temp;
        state.road_temp = payload.road_temp;
        state.weather_graphic = payload.weather_graphic;
        // Elapsed-ms is mutated silently by design (§9 Design Notes/Open Qs).
        state.elapsed_ms = payload.elapsed_ms;

        SessionEventOutcome { should_broadcast: changed }
    }

    /// §4.3 End session: cancel the poller, cancel every active swap, apply
    /// accumulated penalties, clear the accumulator.
    pub async fn handle_end_session(
        &self,
        result_filepath: &str,
        penalty_service: &Arc<dyn PenaltyService>,
    ) {
        if let Some(cancel) = self.poller_cancel.write().await.take() {
            cancel.cancel();
        }

        for cancel in self.swap_cancels.write().await.drain(..) {
            cancel.cancel();
        }

        let result_filename =
            std::path::Path::new(result_filepath).file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();

        let penalties = self.penalties.write().await.drain().collect::<Vec<_>>();
        for (identity, penalty) in penalties {
            if let Err(e) = penalty_service
                .apply_penalty(&result_filename, &identity, &penalty.car_model.0, penalty.seconds, true)
                .await
            {
                warn!(identity = %identity, err = %e, "failed to apply driver-swap penalty");
            }
        }
    }

    async fn restart_poller(
        self: &Arc<Self>,
        registry: &Arc<DriverRegistry>,
        liveness: &Arc<LivenessTracker>,
        process: &Arc<dyn ProcessHandle>,
        broadcast: &Arc<dyn Broadcast>,
    ) {
        let cancel = CancellationToken::new();
        let mut guard = self.poller_cancel.write().await;
        if let Some(old) = guard.replace(cancel.clone()) {
            old.cancel();
        }
        drop(guard);

        poller::spawn_session_info_poller(
            Arc::clone(registry),
            Arc::clone(liveness),
            Arc::clone(process),
            Arc::clone(broadcast),
            Arc::clone(self),
            cancel,
        );
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
