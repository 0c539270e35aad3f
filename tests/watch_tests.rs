use futures_util::StreamExt;
use mcpdesk::test_utils::test_helpers::TEST_POLL_INTERVAL;
use mcpdesk::watch::{
    ChangeChannel, ChangeFrame, ChangeStream, SubscriptionStatus, WatchHub, WatchService,
    WatchState,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(3);

fn hub() -> Arc<WatchHub> {
    WatchHub::new(WatchService::new(TEST_POLL_INTERVAL))
}

async fn wait_closed(stream: ChangeStream) {
    let mut status = stream.status_changes();
    drop(stream);
    tokio::time::timeout(WAIT, status.wait_for(|s| *s == SubscriptionStatus::Closed))
        .await
        .expect("teardown should finish")
        .expect("status sender should publish closed");
}

#[tokio::test]
async fn test_watch_reports_change_after_start() {
    let dir = TempDir::new().unwrap();
    let handle = WatchService::new(TEST_POLL_INTERVAL)
        .start(dir.path())
        .unwrap();
    let mut events = handle.subscribe();

    std::fs::write(dir.path().join("new.txt"), "hello").unwrap();

    let notification = tokio::time::timeout(WAIT, events.next())
        .await
        .expect("change should be observed")
        .expect("watch still running");
    assert_eq!(notification.sequence, 1);

    handle.stop();
    assert_eq!(handle.state(), WatchState::Stopped);
}

#[tokio::test]
async fn test_fan_out_delivers_once_to_each_subscriber() {
    let dir = TempDir::new().unwrap();
    let hub = hub();

    let first = hub.acquire(dir.path()).unwrap();
    let second = hub.acquire(dir.path()).unwrap();
    let mut first_events = first.subscribe().unwrap();
    let mut second_events = second.subscribe().unwrap();

    std::fs::create_dir(dir.path().join("created")).unwrap();

    for events in [&mut first_events, &mut second_events] {
        let notification = tokio::time::timeout(WAIT, events.next())
            .await
            .expect("each subscriber sees the change")
            .expect("watch still running");
        assert_eq!(notification.sequence, 1);
    }

    // Nothing else changed, so no duplicate follows
    let quiet = Duration::from_millis(200);
    assert!(tokio::time::timeout(quiet, first_events.next()).await.is_err());
    assert!(tokio::time::timeout(quiet, second_events.next()).await.is_err());
}

#[tokio::test]
async fn test_channel_forwards_change_frames() {
    let dir = TempDir::new().unwrap();
    let hub = hub();

    let lease = hub.acquire(dir.path()).unwrap();
    let mut stream = ChangeChannel::open(lease, Duration::from_secs(60));
    assert_eq!(stream.status(), SubscriptionStatus::Active);

    std::fs::write(dir.path().join("note.md"), "# hi").unwrap();

    let frame = tokio::time::timeout(WAIT, stream.next())
        .await
        .expect("change frame should arrive");
    assert_eq!(frame, Some(ChangeFrame::Change));

    wait_closed(stream).await;
}

#[tokio::test]
async fn test_channel_emits_keep_alive_when_idle() {
    let dir = TempDir::new().unwrap();
    let hub = hub();

    let lease = hub.acquire(dir.path()).unwrap();
    let mut stream = ChangeChannel::open(lease, Duration::from_millis(50));

    for _ in 0..2 {
        let frame = tokio::time::timeout(WAIT, stream.next())
            .await
            .expect("keep-alive should arrive");
        assert_eq!(frame, Some(ChangeFrame::KeepAlive));
    }

    wait_closed(stream).await;
}

#[tokio::test]
async fn test_disconnect_releases_watch() {
    let dir = TempDir::new().unwrap();
    let hub = hub();

    let keep_alive = Duration::from_millis(50);
    let first = ChangeChannel::open(hub.acquire(dir.path()).unwrap(), keep_alive);
    let second = ChangeChannel::open(hub.acquire(dir.path()).unwrap(), keep_alive);
    assert_eq!(hub.subscriber_count(dir.path()), 2);

    wait_closed(first).await;
    assert_eq!(hub.subscriber_count(dir.path()), 1);
    assert_eq!(hub.active_roots().len(), 1);

    wait_closed(second).await;
    assert_eq!(hub.subscriber_count(dir.path()), 0);
    assert!(hub.active_roots().is_empty());

    // A later subscriber starts a fresh watch
    let lease = hub.acquire(dir.path()).unwrap();
    assert_eq!(hub.subscriber_count(dir.path()), 1);
    drop(lease);
}

#[tokio::test]
async fn test_keep_alive_stops_after_disconnect() {
    let dir = TempDir::new().unwrap();
    let hub = hub();

    let lease = hub.acquire(dir.path()).unwrap();
    let mut stream = ChangeChannel::open(lease, Duration::from_millis(20));
    let frame = tokio::time::timeout(WAIT, stream.next()).await.unwrap();
    assert_eq!(frame, Some(ChangeFrame::KeepAlive));

    let mut status = stream.status_changes();
    drop(stream);
    tokio::time::timeout(WAIT, status.wait_for(|s| *s == SubscriptionStatus::Closed))
        .await
        .unwrap()
        .unwrap();

    // Writer task has exited: the status channel has no sender left
    assert!(status.changed().await.is_err());
}
