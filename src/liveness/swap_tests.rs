use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::model::{CarModel, DriverGuid};
use crate::session::SessionController;
use crate::test_support::FakeProcess;

#[tokio::test(start_paused = true)]
async fn scenario_five_early_departure_earns_a_penalty() {
    let registry = Arc::new(DriverRegistry::new());
    registry
        .connect(CarId(3), DriverGuid("g1".into()), "Driver One", "car_a", 0)
        .await;

    // Original driver disconnects, new driver takes the slot.
    registry.record_disconnect(&DriverGuid("g1".into())).await.unwrap();
    registry
        .connect(CarId(3), DriverGuid("g2".into()), "Driver Two", "car_a", 1_000)
        .await;
    registry.mark_loaded(CarId(3), 1_000).await.unwrap();

    let process = Arc::new(FakeProcess::default());
    let session = Arc::new(SessionController::new());
    let cancel = CancellationToken::new();

    let params = SwapParams {
        complete_time: Duration::from_secs(10),
        disqualify_window: Duration::from_secs(9),
        penalty_window: Duration::from_secs(5),
    };

    spawn_swap_supervisor(
        Arc::clone(&registry),
        process.clone() as Arc<dyn crate::collab::ProcessHandle>,
        Arc::clone(&session),
        CarId(3),
        DriverGuid("g1".into()),
        Vec3 { x: 0.0, y: 0.0, z: 0.0 },
        params,
        cancel.clone(),
    );

    // Tick 1: WaitingForNewDriver -> AwaitingFirstPosition.
    time::advance(Duration::from_secs(1)).await;
    task_yield().await;

    // Give the new driver a non-zero position: AwaitingFirstPosition -> CountingDown.
    registry
        .with_connected_mut(&DriverGuid("g2".into()), |record| {
            record.last_pos = Vec3 { x: 1.0, y: 0.0, z: 0.0 };
        })
        .await;
    time::advance(Duration::from_secs(1)).await;
    task_yield().await;

    // Two counting-down ticks elapse (total_time reaches 2s, countdown = 8s)
    // before the new driver moves far enough to trigger the early-departure
    // check.
    time::advance(Duration::from_secs(1)).await;
    task_yield().await;

    registry
        .with_connected_mut(&DriverGuid("g2".into()), |record| {
            record.last_pos = Vec3 { x: 20.0, y: 0.0, z: 0.0 };
        })
        .await;
    time::advance(Duration::from_secs(1)).await;
    task_yield().await;

    cancel.cancel();
    task_yield().await;

    let penalties = session.drain_penalties_for_test().await;
    let penalty = penalties.get(&DriverGuid("g2".into())).expect("penalty recorded");
    assert_eq!(penalty.seconds, 13.0);
    assert_eq!(penalty.car_model, CarModel("car_a".into()));
}

#[tokio::test(start_paused = true)]
async fn original_driver_reconnecting_aborts_supervision() {
    let registry = Arc::new(DriverRegistry::new());
    registry
        .connect(CarId(3), DriverGuid("g1".into()), "Driver One", "car_a", 0)
        .await;
    registry.record_disconnect(&DriverGuid("g1".into())).await.unwrap();

    let process = Arc::new(FakeProcess::default());
    let session = Arc::new(SessionController::new());
    let cancel = CancellationToken::new();

    let params = SwapParams {
        complete_time: Duration::from_secs(10),
        disqualify_window: Duration::from_secs(8),
        penalty_window: Duration::from_secs(5),
    };

    spawn_swap_supervisor(
        Arc::clone(&registry),
        process.clone() as Arc<dyn crate::collab::ProcessHandle>,
        Arc::clone(&session),
        CarId(3),
        DriverGuid("g1".into()),
        Vec3::default(),
        params,
        cancel.clone(),
    );

    registry
        .connect(CarId(3), DriverGuid("g1".into()), "Driver One", "car_a", 2_000)
        .await;

    time::advance(Duration::from_secs(1)).await;
    task_yield().await;

    // No penalty should ever be recorded; the supervisor should have exited.
    let penalties = session.drain_penalties_for_test().await;
    assert!(penalties.is_empty());
}

async fn task_yield() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
