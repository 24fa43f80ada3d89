// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic session-info poller (§4.4). Cancelable via a distinct cancel
//! signal independent of per-driver swap cancellation (§5).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collab::{Broadcast, ProcessHandle, SessionInfoPoll};
use crate::event::{BroadcastMessage, SNAPSHOT_EVENT_CODE};
use crate::liveness::LivenessTracker;
use crate::model::SessionKind;
use crate::registry::DriverRegistry;

use super::SessionController;

const POLL_PERIOD: Duration = Duration::from_secs(30);

/// Spawn the session-info poller as a background task.
pub fn spawn_session_info_poller(
    registry: Arc<DriverRegistry>,
    liveness: Arc<LivenessTracker>,
    process: Arc<dyn ProcessHandle>,
    broadcast: Arc<dyn Broadcast>,
    session: Arc<SessionController>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        info!("session-info poller started");
        let mut interval = tokio::time::interval(POLL_PERIOD);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("session-info poller canceled");
                    break;
                }
                _ = interval.tick() => {}
            }

            match process.get_session_info().await {
                Ok(SessionInfoPoll::Info(payload)) => {
                    let outcome = session.handle_update(payload).await;
                    if outcome.should_broadcast {
                        if let Some(state) = session.current().await {
                            let snapshot = registry.snapshot(state).await;
                            debug!(event_code = SNAPSHOT_EVENT_CODE, "broadcasting snapshot");
                            broadcast.send(BroadcastMessage::Snapshot(snapshot)).await;
                        }
                    }
                }
                Ok(SessionInfoPoll::NoOpenConnection) => {
                    debug!("process reports no open connection, stopping poller");
                    break;
                }
                Ok(SessionInfoPoll::Done) => {
                    info!("process signaled done, disconnecting all drivers");
                    let identities = registry.disconnect_all_connected().await;
                    for identity in &identities {
                        liveness.clear(identity).await;
                    }
                    if let Some(state) = session.current().await {
                        let snapshot = registry.snapshot(state).await;
                        debug!(event_code = SNAPSHOT_EVENT_CODE, "broadcasting snapshot");
                        broadcast.send(BroadcastMessage::Snapshot(snapshot)).await;
                    } else {
                        let snapshot = registry
                            .snapshot(crate::model::SessionState {
                                kind: SessionKind::Practice,
                                track: String::new(),
                                track_layout: String::new(),
                                name: String::new(),
                                elapsed_ms: 0,
                                ambient_temp: 0.0,
                                road_temp: 0.0,
                                weather_graphic: String::new(),
                                start_wall_clock_millis: 0,
                            })
                            .await;
                        debug!(event_code = SNAPSHOT_EVENT_CODE, "broadcasting snapshot");
                        broadcast.send(BroadcastMessage::Snapshot(snapshot)).await;
                    }
                    break;
                }
                Err(e) => {
                    warn!(err = %e, "session-info poll failed");
                }
            }
        }
    });
}
