// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Dispatcher (§4.1): the single entry point for decoded events. Routes
//! to the Registry/Session/Liveness/Timing handlers, broadcasts the snapshot
//! and forwards the raw event when a handler signals a state change, and
//! schedules a best-effort persistence flush.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::collab::{Broadcast, LiveTimingStore, PenaltyService, ProcessHandle, TrackGateway};
use crate::event::{BroadcastMessage, Event, SessionCarInfoKind, SNAPSHOT_EVENT_CODE};
use crate::liveness::swap::{spawn_swap_supervisor, SwapParams};
use crate::liveness::{apply_car_update, LivenessTracker};
use crate::model::RaceControlSnapshot;
use crate::registry::wrap::wrap_welcome;
use crate::registry::DriverRegistry;
use crate::session::SessionController;
use crate::timing;

/// Shared collaborators and state handed to every dispatch call.
pub struct Dispatcher {
    pub registry: Arc<DriverRegistry>,
    pub session: Arc<SessionController>,
    pub liveness: Arc<LivenessTracker>,
    pub clock: Arc<dyn Clock>,
    pub process: Arc<dyn ProcessHandle>,
    pub track_gateway: Arc<dyn TrackGateway>,
    pub store: Arc<dyn LiveTimingStore>,
    pub penalty_service: Arc<dyn PenaltyService>,
    pub broadcast: Arc<dyn Broadcast>,
    /// Single-writer latch for persistence flushes (§5: "plain mutex, latest
    /// wins, no queueing required").
    persist_lock: Arc<Mutex<()>>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<DriverRegistry>,
        session: Arc<SessionController>,
        liveness: Arc<LivenessTracker>,
        clock: Arc<dyn Clock>,
        process: Arc<dyn ProcessHandle>,
        track_gateway: Arc<dyn TrackGateway>,
        store: Arc<dyn LiveTimingStore>,
        penalty_service: Arc<dyn PenaltyService>,
        broadcast: Arc<dyn Broadcast>,
    ) -> Self {
        Self {
            registry,
            session,
            liveness,
            clock,
            process,
            track_gateway,
            store,
            penalty_service,
            broadcast,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// §4.1 routing table. Handler errors are logged and swallowed; they
    /// never halt ingestion.
    pub async fn dispatch(self: &Arc<Self>, event: Event) {
        let should_broadcast = match &event {
            Event::Version { number } => {
                debug!(number = *number, "protocol version reported by process");
                false
            }

            Event::SessionInfo(payload) if payload.is_new_session => {
                match self
                    .session
                    .handle_new_session(
                        payload.clone(),
                        &self.registry,
                        &self.liveness,
                        &self.track_gateway,
                        &self.store,
                        &self.process,
                        &self.broadcast,
                        &self.clock,
                    )
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(err = %e, "new-session setup failed");
                        false
                    }
                }
            }
            Event::SessionInfo(payload) => self.session.handle_update(payload.clone()).await.should_broadcast,

            Event::EndSession { result_filepath } => {
                self.session.handle_end_session(result_filepath, &self.penalty_service).await;
                true
            }

            Event::CarUpdate { slot, velocity, pos } => self.handle_car_update(*slot, *velocity, *pos).await,

            Event::SessionCarInfo { slot, identity, raw_name, car_model, kind } => match kind {
                SessionCarInfoKind::NewConnection => {
                    self.handle_connect(*slot, identity.clone(), raw_name, car_model).await;
                    true
                }
                SessionCarInfoKind::ConnectionClosed => {
                    self.handle_disconnect(*slot, identity.clone()).await;
                    true
                }
            },

            Event::ClientLoaded { slot } => {
                self.handle_loaded(*slot).await;
                true
            }

            Event::CollisionWithCar { slot, other_slot, impact_speed_kmh } => {
                if let Err(e) = timing::record_collision_with_car(
                    &self.registry,
                    self.clock.as_ref(),
                    *slot,
                    *other_slot,
                    *impact_speed_kmh,
                )
                .await
                {
                    warn!(err = %e, "collision-with-car handler failed");
                }
                true
            }
            Event::CollisionWithEnvironment { slot, impact_speed_kmh } => {
                if let Err(e) = timing::record_collision_with_environment(
                    &self.registry,
                    self.clock.as_ref(),
                    *slot,
                    *impact_speed_kmh,
                )
                .await
                {
                    warn!(err = %e, "collision-with-environment handler failed");
                }
                true
            }
            Event::LapCompleted { slot, lap_time_ms, cuts } => {
                let kind = self.session.current().await.map(|s| s.kind).unwrap_or(crate::model::SessionKind::Practice);
                if let Err(e) =
                    timing::record_lap_completed(&self.registry, self.clock.as_ref(), kind, *slot, *lap_time_ms, *cuts)
                        .await
                {
                    warn!(err = %e, "lap-completed handler failed");
                }
                true
            }

            Event::Other => false,
        };

        self.broadcast.send(BroadcastMessage::Forwarded(event)).await;

        if should_broadcast {
            if let Some(state) = self.session.current().await {
                let snapshot = self.registry.snapshot(state).await;
                self.schedule_persistence_flush(snapshot.clone());
                debug!(event_code = SNAPSHOT_EVENT_CODE, "broadcasting snapshot");
                self.broadcast.send(BroadcastMessage::Snapshot(snapshot)).await;
            }
        }
    }

    /// Persistence is independent of ingestion (§5 scheduling model): flush
    /// in a detached task so a slow or failing store never stalls dispatch.
    fn schedule_persistence_flush(self: &Arc<Self>, snapshot: RaceControlSnapshot) {
        let store = Arc::clone(&self.store);
        let persist_lock = Arc::clone(&self.persist_lock);
        tokio::spawn(async move {
            let _guard = persist_lock.lock().await;
            if let Err(e) = store.upsert(&snapshot).await {
                warn!(err = %e, "persistence flush failed");
            }
        });
    }

    /// §4.4 car-update: apply speed/position tracking, feed the liveness
    /// tracker, and disconnect anyone who crossed the miss threshold.
    async fn handle_car_update(
        self: &Arc<Self>,
        slot: crate::model::CarId,
        velocity: crate::model::Vec3,
        pos: crate::model::Vec3,
    ) -> bool {
        let Some(identity) = self.registry.resolve_slot(slot).await else {
            return false;
        };

        let now = self.clock.now_millis();
        self.registry
            .with_connected_mut(&identity, |record| apply_car_update(record, velocity, pos, now))
            .await;

        let connected_count = self.registry.connected_count().await;
        let flagged = self.liveness.on_car_update(&identity, connected_count).await;

        for stale in &flagged {
            self.disconnect_identity(stale.clone()).await;
        }

        !flagged.is_empty()
    }

    async fn handle_connect(&self, slot: crate::model::CarId, identity: crate::model::DriverGuid, raw_name: &str, car_model: &str) {
        let now = self.clock.now_millis();
        self.registry.connect(slot, identity.clone(), raw_name, car_model, now).await;
        self.liveness.ensure(&identity).await;
    }

    async fn handle_disconnect(self: &Arc<Self>, slot: crate::model::CarId, identity: crate::model::DriverGuid) {
        let _ = slot;
        self.disconnect_identity(identity).await;
    }

    /// Shared disconnect path for both explicit disconnects and
    /// liveness-triggered drops (§4.2/§4.4).
    async fn disconnect_identity(self: &Arc<Self>, identity: crate::model::DriverGuid) {
        self.liveness.clear(&identity).await;

        let outcome = match self.registry.record_disconnect(&identity).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(identity = %identity, err = %e, "disconnect handler failed");
                return;
            }
        };

        let swap_enabled = self.process.server_config().await.driver_swap_enabled;
        if swap_enabled {
            self.launch_swap_supervisor(outcome.slot, identity, outcome.last_pos).await;
        }
    }

    async fn launch_swap_supervisor(
        self: &Arc<Self>,
        slot: crate::model::CarId,
        original_identity: crate::model::DriverGuid,
        captured_pos: crate::model::Vec3,
    ) {
        let config = self.process.server_config().await;
        let params = SwapParams {
            complete_time: config.driver_swap_min_time(),
            disqualify_window: config.driver_swap_disqualify_time(),
            penalty_window: config.driver_swap_penalty_time(),
        };
        let cancel = CancellationToken::new();
        self.session.register_swap_cancel(cancel.clone()).await;
        spawn_swap_supervisor(
            Arc::clone(&self.registry),
            Arc::clone(&self.process),
            Arc::clone(&self.session),
            slot,
            original_identity,
            captured_pos,
            params,
            cancel,
        );
    }

    /// §4.2 loaded: mark the timestamp and send the wrapped welcome chat.
    async fn handle_loaded(&self, slot: crate::model::CarId) {
        let now = self.clock.now_millis();
        let identity = match self.registry.mark_loaded(slot, now).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(err = %e, "loaded handler failed");
                return;
            }
        };
        let _ = identity;

        let config = self.process.server_config().await;
        for line in wrap_welcome(&config) {
            if let Err(e) = self.process.send_chat(slot, &line).await {
                warn!(err = %e, "welcome chat send failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
