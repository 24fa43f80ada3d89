// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario tests exercising the full Dispatcher against the
//! in-memory fake collaborators.

use std::sync::Arc;

use race_control::clock::FakeClock;
use race_control::collab::{Broadcast, LiveTimingStore, PenaltyService, ProcessHandle, TrackGateway};
use race_control::config::ServerConfig;
use race_control::dispatcher::Dispatcher;
use race_control::event::{Event, SessionCarInfoKind, SessionInfoPayload};
use race_control::liveness::LivenessTracker;
use race_control::model::{CarId, DriverGuid, SessionKind};
use race_control::registry::DriverRegistry;
use race_control::session::SessionController;
use race_control::test_support::{FakeBroadcast, FakePenaltyService, FakeProcess, FakeStore, FakeTrackGateway};

fn new_race() -> Event {
    Event::SessionInfo(SessionInfoPayload {
        is_new_session: true,
        kind: SessionKind::Race,
        track: "spa".into(),
        track_layout: "gp".into(),
        name: "feature race".into(),
        elapsed_ms: 0,
        ambient_temp: 18.0,
        road_temp: 22.0,
        weather_graphic: "3_clear".into(),
    })
}

fn new_practice(name: &str) -> Event {
    Event::SessionInfo(SessionInfoPayload {
        is_new_session: true,
        kind: SessionKind::Practice,
        track: "spa".into(),
        track_layout: "gp".into(),
        name: name.into(),
        elapsed_ms: 0,
        ambient_temp: 18.0,
        road_temp: 22.0,
        weather_graphic: "3_clear".into(),
    })
}

fn connect(slot: u32, guid: &str, raw_name: &str) -> Event {
    Event::SessionCarInfo {
        slot: CarId(slot),
        identity: DriverGuid(guid.into()),
        raw_name: raw_name.into(),
        car_model: "ks_porsche_911_gt3_r".into(),
        kind: SessionCarInfoKind::NewConnection,
    }
}

fn disconnect(slot: u32, guid: &str) -> Event {
    Event::SessionCarInfo {
        slot: CarId(slot),
        identity: DriverGuid(guid.into()),
        raw_name: String::new(),
        car_model: "ks_porsche_911_gt3_r".into(),
        kind: SessionCarInfoKind::ConnectionClosed,
    }
}

fn lap(slot: u32, lap_time_ms: u32, cuts: u32) -> Event {
    Event::LapCompleted { slot: CarId(slot), lap_time_ms, cuts }
}

struct Harness {
    dispatcher: Arc<Dispatcher>,
}

impl Harness {
    fn new(config: ServerConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(DriverRegistry::new()),
            Arc::new(SessionController::new()),
            Arc::new(LivenessTracker::new()),
            Arc::new(FakeClock::new(0)),
            Arc::new(FakeProcess::new(config)) as Arc<dyn ProcessHandle>,
            Arc::new(FakeTrackGateway::default()) as Arc<dyn TrackGateway>,
            Arc::new(FakeStore::default()) as Arc<dyn LiveTimingStore>,
            Arc::new(FakePenaltyService::default()) as Arc<dyn PenaltyService>,
            Arc::new(FakeBroadcast::default()) as Arc<dyn Broadcast>,
        ));
        Self { dispatcher }
    }

    async fn dispatch(&self, event: Event) {
        self.dispatcher.dispatch(event).await;
    }
}

#[tokio::test]
async fn scenario_one_single_driver_clean_lap() {
    let harness = Harness::new(ServerConfig::default());
    harness.dispatch(new_race()).await;
    harness.dispatch(connect(0, "g1", "ada")).await;
    harness.dispatch(Event::ClientLoaded { slot: CarId(0) }).await;
    harness.dispatch(lap(0, 90_000, 0)).await;

    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    let record = &snapshot.drivers[&DriverGuid("g1".into())];
    assert_eq!(record.current_stats().best_lap, std::time::Duration::from_secs(90));
    assert_eq!(record.current_stats().num_laps, 1);
    assert_eq!(record.split, "0s");
    assert_eq!(record.position, 1);
}

#[tokio::test]
async fn scenario_two_race_positions_and_lap_gap_split() {
    let harness = Harness::new(ServerConfig::default());
    harness.dispatch(new_race()).await;
    harness.dispatch(connect(0, "g1", "ada")).await;
    harness.dispatch(connect(1, "g2", "bo")).await;

    harness.dispatch(lap(0, 95_000, 0)).await;
    harness.dispatch(lap(0, 90_000, 0)).await;
    harness.dispatch(lap(1, 88_000, 0)).await;

    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    let g1 = &snapshot.drivers[&DriverGuid("g1".into())];
    let g2 = &snapshot.drivers[&DriverGuid("g2".into())];

    assert_eq!(g1.position, 1);
    assert_eq!(g1.current_stats().num_laps, 2);
    assert_eq!(g2.position, 2);
    assert_eq!(g2.current_stats().num_laps, 1);
    assert_eq!(g2.split, "1 lap");
}

#[tokio::test]
async fn scenario_three_practice_best_lap_order_and_ms_gap() {
    let harness = Harness::new(ServerConfig::default());
    harness.dispatch(new_practice("open practice")).await;
    harness.dispatch(connect(0, "g1", "ada")).await;
    harness.dispatch(connect(1, "g2", "bo")).await;

    harness.dispatch(lap(0, 90_000, 0)).await;
    harness.dispatch(lap(1, 90_250, 0)).await;

    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    let g1 = &snapshot.drivers[&DriverGuid("g1".into())];
    let g2 = &snapshot.drivers[&DriverGuid("g2".into())];

    assert_eq!(g1.position, 1);
    assert_eq!(g1.split, "0s");
    assert_eq!(g2.position, 2);
    assert_eq!(g2.split, "250ms");
}

#[tokio::test]
async fn scenario_four_zero_lap_disconnect_is_dropped() {
    let harness = Harness::new(ServerConfig::default());
    harness.dispatch(new_race()).await;
    harness.dispatch(connect(0, "g1", "ada")).await;
    harness.dispatch(disconnect(0, "g1")).await;

    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    assert!(!snapshot.drivers.contains_key(&DriverGuid("g1".into())));
}

#[tokio::test]
async fn scenario_six_looped_practice_preserves_identity_and_best_lap() {
    let harness = Harness::new(ServerConfig::default());
    harness.dispatch(new_practice("fp1")).await;
    harness.dispatch(connect(0, "g1", "ada")).await;
    harness.dispatch(lap(0, 90_000, 0)).await;

    // Looped practice: same identifiers -> preserved.
    harness.dispatch(new_practice("fp1")).await;
    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    let record = &snapshot.drivers[&DriverGuid("g1".into())];
    assert_eq!(record.current_stats().best_lap, std::time::Duration::from_secs(90));

    // Different session identifiers -> reset.
    harness.dispatch(new_race()).await;
    let snapshot = harness
        .dispatcher
        .registry
        .snapshot(harness.dispatcher.session.current().await.unwrap())
        .await;
    let record = &snapshot.drivers[&DriverGuid("g1".into())];
    assert_eq!(record.current_stats().best_lap, std::time::Duration::ZERO);
}
