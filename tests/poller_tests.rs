// Status poller tests: stale-but-available snapshot, stop, completion order

mod common;

use std::time::Duration;

use common::{ScriptedStatus, sessions};
use trainwatch::error::TelemetryError;
use trainwatch::status_poller;

const ENDPOINT: &str = "/status";

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_last_snapshot() {
    let source = ScriptedStatus::new(vec![
        (Duration::ZERO, sessions(3)),
        (
            Duration::ZERO,
            Err(TelemetryError::Request("connection refused".into())),
        ),
    ]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(1));
    let mut rx = poller.subscribe();

    let state = rx.wait_for(|s| s.failures == 1).await.unwrap().clone();
    assert_eq!(state.snapshot.map(|s| s.active_sessions), Some(3));
    assert!(state.last_error.unwrap().contains("connection refused"));
    assert_eq!(state.successes, 1);

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_first_request_goes_out_immediately() {
    let source = ScriptedStatus::new(vec![(Duration::ZERO, sessions(1))]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(3600));
    let mut rx = poller.subscribe();
    let started = tokio::time::Instant::now();
    rx.wait_for(|s| s.successes == 1).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_update_after_stop() {
    let source = ScriptedStatus::new(vec![(Duration::from_secs(5), sessions(7))]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(60));
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.requests_issued == 1).await.unwrap();

    poller.stop().await;
    let after_stop = rx.borrow().clone();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(*rx.borrow(), after_stop);
    assert!(after_stop.snapshot.is_none());
    assert_eq!(after_stop.in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_results_apply_in_completion_order() {
    // First request is slow, second is fast: the slow one lands last and wins.
    let source = ScriptedStatus::new(vec![
        (Duration::from_secs(3), sessions(1)),
        (Duration::ZERO, sessions(2)),
    ]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(1));
    let mut rx = poller.subscribe();

    let state = rx.wait_for(|s| s.successes == 1).await.unwrap().clone();
    assert_eq!(state.snapshot.map(|s| s.active_sessions), Some(2));

    let state = rx.wait_for(|s| s.successes == 2).await.unwrap().clone();
    assert_eq!(state.snapshot.map(|s| s.active_sessions), Some(1));
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_success_after_failure_clears_error() {
    let source = ScriptedStatus::new(vec![
        (Duration::ZERO, Err(TelemetryError::Request("timeout".into()))),
        (Duration::ZERO, sessions(4)),
    ]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(1));
    let mut rx = poller.subscribe();

    let state = rx.wait_for(|s| s.failures == 1).await.unwrap().clone();
    assert!(state.snapshot.is_none());
    assert!(state.last_error.is_some());

    let state = rx.wait_for(|s| s.successes == 1).await.unwrap().clone();
    assert_eq!(state.snapshot.map(|s| s.active_sessions), Some(4));
    assert!(state.last_error.is_none());
    assert_eq!(poller.latest(), state);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_cancels_polling() {
    let source = ScriptedStatus::new(vec![(Duration::ZERO, sessions(1))]);
    let poller = status_poller::start(source, ENDPOINT, Duration::from_secs(1));
    let mut rx = poller.subscribe();
    rx.wait_for(|s| s.successes == 1).await.unwrap();
    drop(poller);
    // Ends once the poll task drops its sender.
    while rx.changed().await.is_ok() {}
    assert_eq!(rx.borrow().successes, 1);
}
