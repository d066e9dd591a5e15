//! Orchestrator ordering and failure handling against recording fakes.

mod common;

use std::time::Duration;

use axum::http::Method;

use common::{test_config, Behavior, Call, CallLog, FakeController, FakeListener};
use gateway_controller::lifecycle::{termination, Delivery, LifecycleError, Orchestrator, Stage, INJECT_PATH};

fn full_sequence() -> Vec<Call> {
    vec![
        Call::Configure,
        Call::AddRoute(Method::POST, INJECT_PATH.to_string()),
        Call::ControllerStart,
        Call::ListenerStart,
        Call::ListenerStop,
        Call::ControllerStop,
    ]
}

#[tokio::test]
async fn test_waits_for_termination_then_stops_in_order() {
    let log = CallLog::default();
    let orchestrator = Orchestrator::new(FakeListener::new(&log), FakeController::new(&log), &test_config());
    assert_eq!(orchestrator.stage(), Stage::Unstarted);

    let (mut trigger, termination) = termination();
    let run = tokio::spawn(orchestrator.run(termination));

    while !log.contains(&Call::ListenerStart) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!log.contains(&Call::ListenerStop));
    assert!(!run.is_finished());

    assert_eq!(trigger.fire(), Delivery::Graceful);
    run.await.unwrap().unwrap();
    assert_eq!(log.calls(), full_sequence());
}

#[tokio::test]
async fn test_signal_before_start_is_not_lost() {
    let log = CallLog::default();
    let orchestrator = Orchestrator::new(FakeListener::new(&log), FakeController::new(&log), &test_config());

    let (mut trigger, termination) = termination();
    trigger.fire();

    orchestrator.run(termination).await.unwrap();
    assert_eq!(log.calls(), full_sequence());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_trigger_never_stops() {
    let log = CallLog::default();
    let orchestrator = Orchestrator::new(FakeListener::new(&log), FakeController::new(&log), &test_config());

    let (trigger, termination) = termination();
    drop(trigger);

    let outcome = tokio::time::timeout(Duration::from_secs(3600), orchestrator.run(termination)).await;
    assert!(outcome.is_err());
    assert!(log.contains(&Call::ListenerStart));
    assert!(!log.contains(&Call::ListenerStop));
}

#[tokio::test]
async fn test_invalid_injector_config_touches_nothing() {
    let log = CallLog::default();
    let mut config = test_config();
    config.injector.containers.clear();

    let orchestrator = Orchestrator::new(FakeListener::new(&log), FakeController::new(&log), &config);
    let (_trigger, termination) = termination();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Injector(_)));
    assert_eq!(err.stage(), Stage::Unstarted);
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_configure_failure_stops_before_routes() {
    let log = CallLog::default();
    let mut listener = FakeListener::new(&log);
    listener.configure = Behavior::Fail;

    let orchestrator = Orchestrator::new(listener, FakeController::new(&log), &test_config());
    let (_trigger, termination) = termination();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Configure(_)));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_route_failure_never_starts_controller() {
    let log = CallLog::default();
    let mut listener = FakeListener::new(&log);
    listener.route = Behavior::Fail;

    let orchestrator = Orchestrator::new(listener, FakeController::new(&log), &test_config());
    let (_trigger, termination) = termination();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Route { path: INJECT_PATH, .. }));
    assert_eq!(err.stage(), Stage::Configured);
    assert_eq!(log.calls(), vec![Call::Configure]);
}

#[tokio::test]
async fn test_controller_start_failure_leaves_listener_untouched() {
    let log = CallLog::default();
    let mut controller = FakeController::new(&log);
    controller.start = Behavior::Fail;

    let orchestrator = Orchestrator::new(FakeListener::new(&log), controller, &test_config());
    let (_trigger, termination) = termination();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ControllerStart(_)));
    assert_eq!(err.stage(), Stage::Registered);
    assert!(err.to_string().contains("controller start failed"));

    assert!(!log.contains(&Call::ListenerStart));
    assert!(!log.contains(&Call::ListenerStop));
    assert!(!log.contains(&Call::ControllerStop));
}

#[tokio::test]
async fn test_listener_stop_failure_skips_controller_stop() {
    let log = CallLog::default();
    let mut listener = FakeListener::new(&log);
    listener.stop = Behavior::Fail;

    let orchestrator = Orchestrator::new(listener, FakeController::new(&log), &test_config());
    let (mut trigger, termination) = termination();
    trigger.fire();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ServerStop(_)));
    assert_eq!(err.stage(), Stage::Stopping);
    assert!(log.contains(&Call::ListenerStop));
    assert!(!log.contains(&Call::ControllerStop));
}

#[tokio::test]
async fn test_controller_stop_failure_is_reported() {
    let log = CallLog::default();
    let mut controller = FakeController::new(&log);
    controller.stop = Behavior::Fail;

    let orchestrator = Orchestrator::new(FakeListener::new(&log), controller, &test_config());
    let (mut trigger, termination) = termination();
    trigger.fire();

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ControllerStop(_)));
    assert_eq!(log.calls(), full_sequence());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_stop_times_out() {
    let log = CallLog::default();
    let mut listener = FakeListener::new(&log);
    listener.stop = Behavior::Hang;

    let orchestrator = Orchestrator::new(listener, FakeController::new(&log), &test_config());
    let (mut trigger, termination) = termination();
    trigger.fire();

    let err = orchestrator.run(termination).await.unwrap_err();
    match err {
        LifecycleError::StopTimeout { component, timeout } => {
            assert_eq!(component, "web server");
            assert_eq!(timeout, Duration::from_secs(5));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!log.contains(&Call::ControllerStop));
}

#[tokio::test]
async fn test_second_signal_forces_shutdown() {
    let log = CallLog::default();
    let mut controller = FakeController::new(&log);
    controller.stop = Behavior::Hang;

    let mut config = test_config();
    config.shutdown.timeout_secs = 3600;

    let orchestrator = Orchestrator::new(FakeListener::new(&log), controller, &config);
    let (mut trigger, termination) = termination();
    assert_eq!(trigger.fire(), Delivery::Graceful);
    assert_eq!(trigger.fire(), Delivery::Forced);
    assert_eq!(trigger.fire(), Delivery::Ignored);

    let err = orchestrator.run(termination).await.unwrap_err();
    assert!(matches!(err, LifecycleError::ForcedShutdown));
    assert_eq!(err.stage(), Stage::Stopping);
}
