use super::*;

#[tokio::test]
async fn connect_then_disconnect_with_zero_laps_is_dropped() {
    let registry = DriverRegistry::new();
    let identity = DriverGuid("g1".into());
    registry.connect(CarId(0), identity.clone(), "Ada", "car_a", 1_000).await;

    assert!(registry.identity_connected(&identity).await);

    let outcome = registry.record_disconnect(&identity).await.unwrap();
    assert!(!outcome.retained);
    assert!(!registry.identity_connected(&identity).await);

    let snapshot = registry.snapshot(dummy_session()).await;
    assert!(!snapshot.drivers.contains_key(&identity));
}

#[tokio::test]
async fn driver_with_laps_moves_to_disconnected() {
    let registry = DriverRegistry::new();
    let identity = DriverGuid("g1".into());
    registry.connect(CarId(0), identity.clone(), "Ada", "car_a", 1_000).await;

    registry
        .with_connected_mut(&identity, |record| {
            record.current_stats_mut().num_laps = 1;
            record.total_num_laps = 1;
        })
        .await;

    let outcome = registry.record_disconnect(&identity).await.unwrap();
    assert!(outcome.retained);
    assert!(!registry.identity_connected(&identity).await);

    let snapshot = registry.snapshot(dummy_session()).await;
    assert!(snapshot.drivers.contains_key(&identity));
}

#[tokio::test]
async fn disconnect_unknown_driver_fails() {
    let registry = DriverRegistry::new();
    let err = registry.record_disconnect(&DriverGuid("nope".into())).await.unwrap_err();
    assert_eq!(err, CoreError::UnknownDriver);
}

#[tokio::test]
async fn reconnect_promotes_prior_record_and_slot_index_stays_consistent() {
    let registry = DriverRegistry::new();
    let identity = DriverGuid("g1".into());
    registry.connect(CarId(3), identity.clone(), "Ada", "car_a", 1_000).await;
    registry
        .with_connected_mut(&identity, |record| {
            record.current_stats_mut().num_laps = 2;
            record.total_num_laps = 2;
        })
        .await;
    registry.record_disconnect(&identity).await.unwrap();

    // Slot index has no stale entry after disconnect (invariant P2).
    assert!(registry.resolve_slot(CarId(3)).await.is_none());

    registry.connect(CarId(5), identity.clone(), "Ada", "car_a", 2_000).await;
    assert_eq!(registry.resolve_slot(CarId(5)).await, Some(identity.clone()));

    let connected = registry.connected_snapshot().await;
    let record = &connected[&identity];
    assert_eq!(record.total_num_laps, 2, "prior record's laps should be preserved on reconnect");
}

fn dummy_session() -> SessionState {
    SessionState {
        kind: SessionKind::Practice,
        track: "spa".into(),
        track_layout: "gp".into(),
        name: "test".into(),
        elapsed_ms: 0,
        ambient_temp: 20.0,
        road_temp: 25.0,
        weather_graphic: "3_clear".into(),
        start_wall_clock_millis: 0,
    }
}
