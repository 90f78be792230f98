//! End-to-end behaviour of the wallpaper scheduler against test doubles.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backdrop_lib::constants::store_keys;
use backdrop_lib::provider::ProviderError;
use backdrop_lib::scheduler::{FireOutcome, Interval};
use backdrop_lib::store::MemoryStore;
use common::{MOCK_HOURLY_SECS, NOW, ScriptedProvider, SchedulerHarness};
use serde_json::json;
use tokio::sync::Semaphore;

fn store_with_next_fire(next_fire: f64) -> MemoryStore {
    MemoryStore::with_entries([
        (store_keys::SCHEDULER_INTERVAL, json!("hourly")),
        (store_keys::SCHEDULER_NEXT_FIRE, json!(next_fire)),
    ])
}

// ============================================================================
// Launch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_past_due_fire_runs_on_start_and_reschedules() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW - 5.0), ScriptedProvider::new());

    harness.handle.start().await.unwrap();

    assert_eq!(harness.provider.calls(), 1);
    assert_eq!(harness.setter.applied.lock().len(), 1);

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + MOCK_HOURLY_SECS));
    assert_eq!(snapshot.armed.map(|armed| armed.deadline_unix_time), Some(NOW + MOCK_HOURLY_SECS));
    assert_eq!(harness.stored(store_keys::SCHEDULER_NEXT_FIRE), Some(json!(NOW + MOCK_HOURLY_SECS)));
}

#[tokio::test(start_paused = true)]
async fn test_first_launch_fires_immediately() {
    let harness = SchedulerHarness::spawn(MemoryStore::new(), ScriptedProvider::new());

    harness.handle.start().await.unwrap();

    assert_eq!(harness.provider.calls(), 1);
    assert_eq!(harness.stored(store_keys::SCHEDULER_INTERVAL), None);
    assert_eq!(harness.stored(store_keys::SCHEDULER_NEXT_FIRE), Some(json!(NOW + MOCK_HOURLY_SECS)));
}

#[tokio::test(start_paused = true)]
async fn test_future_fire_resumes_remaining_wait() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());

    harness.handle.start().await.unwrap();
    assert_eq!(harness.provider.calls(), 0);

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 30.0));
    assert_eq!(snapshot.armed.map(|armed| armed.deadline_unix_time), Some(NOW + 30.0));

    tokio::time::sleep(Duration::from_secs(29)).await;
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.provider.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW - 5.0), ScriptedProvider::new());

    harness.handle.start().await.unwrap();
    harness.handle.start().await.unwrap();

    assert_eq!(harness.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_next_fire_is_not_advanced_while_fetching() {
    let gate = Arc::new(Semaphore::new(0));
    let harness =
        SchedulerHarness::spawn(store_with_next_fire(NOW - 5.0), ScriptedProvider::gated(gate.clone()));

    let handle = harness.handle.clone();
    let start = tokio::spawn(async move { handle.start().await });

    harness.provider.entered.notified().await;
    // A crash here must leave the fire past due for the next launch.
    assert_eq!(harness.stored(store_keys::SCHEDULER_NEXT_FIRE), Some(json!(NOW - 5.0)));

    harness.clock.advance(Duration::from_secs(2));
    gate.add_permits(1);
    start.await.unwrap().unwrap();

    assert_eq!(
        harness.stored(store_keys::SCHEDULER_NEXT_FIRE),
        Some(json!(NOW + 2.0 + MOCK_HOURLY_SECS))
    );
}

// ============================================================================
// Interval changes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rapid_interval_changes_leave_one_timer() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 1000.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.handle.set_interval(Interval::Daily).await.unwrap();
    harness.handle.set_interval(Interval::Weekly).await.unwrap();

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.interval, Interval::Weekly);
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 300.0));
    assert_eq!(harness.stored(store_keys::SCHEDULER_INTERVAL), Some(json!("weekly")));

    // The daily timer (180s) and the resumed one (1000s) were both replaced.
    tokio::time::sleep(Duration::from_secs(299)).await;
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.provider.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.provider.calls(), 1);
    assert_eq!(snapshot.fire_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_same_interval_arms_once() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 1000.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.handle.set_interval(Interval::Daily).await.unwrap();
    harness.clock.advance(Duration::from_secs(1));
    harness.handle.set_interval(Interval::Daily).await.unwrap();

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 1.0 + 180.0));
    assert_eq!(snapshot.armed.map(|armed| armed.deadline_unix_time), Some(NOW + 1.0 + 180.0));

    tokio::time::sleep(Duration::from_secs(181)).await;
    harness.handle.snapshot().await.unwrap();
    assert_eq!(harness.provider.calls(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_offline_fire_owes_one_retry() {
    let provider = ScriptedProvider::with_results([Err(ProviderError::NoConnectivity)]);
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW - 5.0), provider);

    harness.handle.start().await.unwrap();

    assert!(harness.handle.snapshot().await.unwrap().last_failure_was_connectivity);
    assert_eq!(harness.stored(store_keys::SCHEDULER_CONNECTIVITY_FAILURE), Some(json!(true)));
    assert!(harness.reporter.reported.lock().is_empty());

    assert!(harness.handle.connectivity_restored().await.unwrap());
    assert!(!harness.handle.connectivity_restored().await.unwrap());
    assert!(!harness.handle.connectivity_restored().await.unwrap());

    assert_eq!(harness.provider.calls(), 2);
    assert_eq!(harness.setter.applied.lock().len(), 1);
    assert_eq!(harness.stored(store_keys::SCHEDULER_CONNECTIVITY_FAILURE), Some(json!(false)));
}

#[tokio::test(start_paused = true)]
async fn test_connected_without_owed_retry_does_nothing() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    assert!(!harness.handle.connectivity_restored().await.unwrap());
    assert_eq!(harness.provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_owed_retry_survives_relaunch() {
    let store = MemoryStore::with_entries([
        (store_keys::SCHEDULER_NEXT_FIRE, json!(NOW + 30.0)),
        (store_keys::SCHEDULER_CONNECTIVITY_FAILURE, json!(true)),
    ]);
    let harness = SchedulerHarness::spawn(store, ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    assert!(harness.handle.connectivity_restored().await.unwrap());
    assert_eq!(harness.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_are_reported_and_rescheduled() {
    let provider = ScriptedProvider::with_results([Err(ProviderError::Other("boom".to_string()))]);
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW - 5.0), provider);

    harness.handle.start().await.unwrap();

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert!(!snapshot.last_failure_was_connectivity);
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + MOCK_HOURLY_SECS));
    assert_eq!(harness.reporter.reported.lock().len(), 1);
    assert!(harness.reporter.reported.lock()[0].contains("boom"));
}

#[tokio::test(start_paused = true)]
async fn test_settle_delay_only_precedes_first_fire() {
    let harness = SchedulerHarness::spawn_with_settle_delay(
        store_with_next_fire(NOW - 5.0),
        ScriptedProvider::new(),
        Duration::from_secs(3),
    );
    let handle = harness.handle.clone();
    let start = tokio::spawn(async move { handle.start().await });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.provider.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.provider.calls(), 1);
    start.await.unwrap().unwrap();

    let before = tokio::time::Instant::now();
    let outcome = harness.handle.fire_now().await.unwrap();
    assert!(matches!(outcome, FireOutcome::Applied { .. }));
    assert!(before.elapsed() < Duration::from_secs(1));
    assert_eq!(harness.provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fire_now_reports_outcome() {
    let provider = ScriptedProvider::with_results([Err(ProviderError::NoConnectivity)]);
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), provider);
    harness.handle.start().await.unwrap();

    assert_eq!(harness.handle.fire_now().await.unwrap(), FireOutcome::Deferred);

    harness.clock.advance(Duration::from_secs(10));
    let outcome = harness.handle.fire_now().await.unwrap();
    assert_eq!(outcome, FireOutcome::Applied { path: PathBuf::from("/tmp/backdrop-test/2.jpg") });
    assert_eq!(
        harness.stored(store_keys::SCHEDULER_NEXT_FIRE),
        Some(json!(NOW + 10.0 + MOCK_HOURLY_SECS))
    );
    assert_eq!(harness.stored(store_keys::SCHEDULER_CONNECTIVITY_FAILURE), Some(json!(false)));
}

// ============================================================================
// System events
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_wake_reapplies_without_touching_schedule() {
    let store = MemoryStore::with_entries([
        (store_keys::SCHEDULER_NEXT_FIRE, json!(NOW + 30.0)),
        (store_keys::SCHEDULER_LAST_WALLPAPER, json!("/tmp/backdrop-test/current.jpg")),
    ]);
    let harness = SchedulerHarness::spawn(store, ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.handle.system_wake().unwrap();
    harness.handle.active_space_changed().unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 30.0));
    assert_eq!(harness.provider.calls(), 0);
    assert_eq!(*harness.setter.reapplied.lock(), vec![
        PathBuf::from("/tmp/backdrop-test/current.jpg"),
        PathBuf::from("/tmp/backdrop-test/current.jpg"),
    ]);
}

#[tokio::test(start_paused = true)]
async fn test_wake_after_overslept_fire_time_fires_now() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    // Suspended: the wall clock moves, tokio time does not.
    harness.clock.advance(Duration::from_secs(3600));
    harness.handle.system_wake().unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.provider.calls(), 1);
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 3600.0 + MOCK_HOURLY_SECS));
    assert_eq!(snapshot.armed.map(|armed| armed.deadline_unix_time), Some(NOW + 3600.0 + MOCK_HOURLY_SECS));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(harness.provider.calls(), 1, "the pre-sleep timer must not fire again");
}

#[tokio::test(start_paused = true)]
async fn test_wake_before_fire_time_rearms_for_remaining_wait() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.clock.advance(Duration::from_secs(20));
    harness.handle.system_wake().unwrap();
    let snapshot = harness.handle.snapshot().await.unwrap();

    assert_eq!(harness.provider.calls(), 0);
    assert_eq!(snapshot.next_fire_unix_time, Some(NOW + 30.0));
    assert_eq!(snapshot.armed.map(|armed| armed.deadline_unix_time), Some(NOW + 30.0));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(harness.provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wake_without_wallpaper_is_a_no_op() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.handle.system_wake().unwrap();
    harness.handle.snapshot().await.unwrap();

    assert!(harness.setter.reapplied.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_actor() {
    let harness = SchedulerHarness::spawn(store_with_next_fire(NOW + 30.0), ScriptedProvider::new());
    harness.handle.start().await.unwrap();

    harness.handle.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(harness.handle.snapshot().await.is_err());
    assert_eq!(harness.provider.calls(), 0);
}
