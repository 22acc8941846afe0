// Lifecycle watcher tests: initial listing, event-driven admit/evict, subscription failure

mod common;

use common::{FakeEngine, busy_frame};
use statwatch::collector::ContainerCollector;
use statwatch::config::CollectorConfig;
use statwatch::error::EngineError;
use statwatch::fleet::Fleet;
use statwatch::latch::FirstPaintLatch;
use statwatch::models::LifecycleAction;
use statwatch::registry::Registry;
use statwatch::watcher::{ContainerFleet, LifecycleWatcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const WEB: &str = "aaaaaaaaaaaa1111111111111111111111111111111111111111111111111111";
const DB: &str = "bbbbbbbbbbbb2222222222222222222222222222222222222222222222222222";

fn fleet(engine: &Arc<FakeEngine>, cancel: &CancellationToken) -> Arc<ContainerFleet> {
    let collector = ContainerCollector::new(
        engine.clone(),
        CollectorConfig::default(),
        true,
        cancel.clone(),
    );
    Arc::new(Fleet::new(
        Arc::new(Registry::new()),
        FirstPaintLatch::new(),
        collector,
    ))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn start_lists_existing_containers_by_short_id() {
    let engine = Arc::new(
        FakeEngine::new()
            .containers(&[WEB, DB])
            .frames_then_hang("aaaaaaaaaaaa", vec![busy_frame(1)])
            .frames_then_hang("bbbbbbbbbbbb", vec![busy_frame(2)]),
    );
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let pump = LifecycleWatcher::new(engine.clone(), fleet.clone(), false)
        .start(tx, cancel.clone())
        .await;
    assert!(pump.is_some());
    assert_eq!(fleet.registry().keys(), vec!["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);

    fleet.latch().wait().await;
    let mut opened = engine.opened();
    opened.sort();
    assert_eq!(opened, vec!["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);
    assert!(rx.try_recv().is_err());
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn start_and_die_events_drive_the_registry() {
    let engine = Arc::new(FakeEngine::new().frames_then_hang("aaaaaaaaaaaa", vec![busy_frame(1)]));
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, _rx) = mpsc::unbounded_channel();
    LifecycleWatcher::new(engine.clone(), fleet.clone(), false)
        .start(tx, cancel.clone())
        .await;
    assert!(fleet.registry().is_empty());

    engine.send_event(LifecycleAction::Created, WEB);
    settle().await;
    assert!(fleet.registry().is_empty());

    engine.send_event(LifecycleAction::Started, WEB);
    settle().await;
    assert_eq!(fleet.registry().keys(), vec!["aaaaaaaaaaaa"]);

    // A duplicate start does not double-subscribe.
    engine.send_event(LifecycleAction::Started, WEB);
    settle().await;
    assert_eq!(engine.opened(), vec!["aaaaaaaaaaaa"]);

    engine.send_event(LifecycleAction::Died, WEB);
    settle().await;
    assert!(fleet.registry().is_empty());

    // Removing an absent key is a no-op.
    engine.send_event(LifecycleAction::Removed, WEB);
    settle().await;
    assert!(fleet.registry().is_empty());
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn include_all_admits_on_create_and_keeps_dead_containers() {
    let engine = Arc::new(FakeEngine::new().hang_open("aaaaaaaaaaaa"));
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, _rx) = mpsc::unbounded_channel();
    LifecycleWatcher::new(engine.clone(), fleet.clone(), true)
        .start(tx, cancel.clone())
        .await;

    engine.send_event(LifecycleAction::Created, WEB);
    settle().await;
    assert_eq!(fleet.registry().keys(), vec!["aaaaaaaaaaaa"]);

    engine.send_event(LifecycleAction::Died, WEB);
    engine.send_event(LifecycleAction::Removed, WEB);
    settle().await;
    assert_eq!(fleet.registry().keys(), vec!["aaaaaaaaaaaa"]);
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn subscription_failure_is_reported_and_not_retried() {
    let engine = Arc::new(
        FakeEngine::new()
            .containers(&[WEB])
            .subscribe_error(EngineError::Transport("connection refused".into())),
    );
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let pump = LifecycleWatcher::new(engine.clone(), fleet.clone(), false)
        .start(tx, cancel.clone())
        .await;
    assert!(pump.is_none());
    assert_eq!(
        rx.try_recv().unwrap(),
        EngineError::Transport("connection refused".into())
    );
    assert!(fleet.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn listing_and_stream_errors_are_forwarded() {
    let engine = Arc::new(FakeEngine::new().list_error(EngineError::Disconnected));
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, mut rx) = mpsc::unbounded_channel();
    LifecycleWatcher::new(engine.clone(), fleet.clone(), false)
        .start(tx, cancel.clone())
        .await;
    assert_eq!(rx.try_recv().unwrap(), EngineError::Disconnected);

    engine.send_event_error(EngineError::Disconnected);
    settle().await;
    assert!(rx.try_recv().unwrap().is_disconnect());
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_the_event_pump() {
    let engine = Arc::new(FakeEngine::new());
    let cancel = CancellationToken::new();
    let fleet = fleet(&engine, &cancel);
    let (tx, _rx) = mpsc::unbounded_channel();
    let pump = LifecycleWatcher::new(engine.clone(), fleet.clone(), false)
        .start(tx, cancel.clone())
        .await
        .expect("subscribed");

    cancel.cancel();
    pump.await.unwrap();
}
