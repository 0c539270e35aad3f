//! Per-subscriber change notification channel
//!
//! Each subscriber gets one writer task that owns its outbound frames. Watch
//! notifications and keep-alive ticks are multiplexed in that task, so frames
//! are never interleaved.

use crate::watch::hub::WatchLease;
use crate::watch::service::ChangeEvents;
use axum::response::sse::Event;
use futures_util::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

const OUTBOUND_CAPACITY: usize = 16;

/// One frame written to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrame {
    Change,
    KeepAlive,
}

impl ChangeFrame {
    /// Exact bytes on the wire
    pub fn wire(self) -> &'static str {
        match self {
            ChangeFrame::Change => "event: change\ndata: update\n\n",
            ChangeFrame::KeepAlive => ": keep-alive\n\n",
        }
    }

    pub fn to_event(self) -> Event {
        match self {
            ChangeFrame::Change => Event::default().event("change").data("update"),
            ChangeFrame::KeepAlive => Event::default().comment("keep-alive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Closing,
    Closed,
}

pub struct ChangeChannel;

impl ChangeChannel {
    /// Starts forwarding changes for `lease` to a new [`ChangeStream`]
    ///
    /// The lease is owned by the writer task and released during teardown.
    /// Dropping the returned stream is the disconnect signal.
    pub fn open(lease: WatchLease, keep_alive: Duration) -> ChangeStream {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (status_tx, status_rx) = watch::channel(SubscriptionStatus::Active);
        let cancel = CancellationToken::new();

        // Subscribe before returning so no change after `open` is missed.
        let events = lease.subscribe();
        tracing::debug!(root = %lease.root().display(), "Change subscriber connected");
        tokio::spawn(write_frames(
            lease,
            events,
            keep_alive,
            tx,
            cancel.clone(),
            status_tx,
        ));

        ChangeStream {
            rx,
            status: status_rx,
            _disconnect: cancel.drop_guard(),
        }
    }
}

async fn write_frames(
    mut lease: WatchLease,
    mut events: Option<ChangeEvents>,
    keep_alive: Duration,
    tx: mpsc::Sender<ChangeFrame>,
    cancel: CancellationToken,
    status: watch::Sender<SubscriptionStatus>,
) {
    let mut ticker = interval_at(Instant::now() + keep_alive, keep_alive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if let Some(source) = events.as_mut() {
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                next = source.next() => match next {
                    Some(_) => ChangeFrame::Change,
                    None => break,
                },
                _ = ticker.tick() => ChangeFrame::KeepAlive,
            };

            if tx.send(frame).await.is_err() {
                break;
            }
        }
    }

    status.send_replace(SubscriptionStatus::Closing);
    let root = lease.root().to_path_buf();

    // Teardown order is fixed; each step runs even when already a no-op.
    drop(events);
    drop(ticker);
    lease.release();
    drop(tx);

    status.send_replace(SubscriptionStatus::Closed);
    tracing::debug!(root = %root.display(), "Change subscriber disconnected");
}

/// Outbound frames for one subscriber
///
/// Ends after the watch stops. Dropping it tears the subscription down.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<ChangeFrame>,
    status: watch::Receiver<SubscriptionStatus>,
    _disconnect: DropGuard,
}

impl ChangeStream {
    pub fn status(&self) -> SubscriptionStatus {
        *self.status.borrow()
    }

    /// Receiver that outlives the stream, for observing teardown
    pub fn status_changes(&self) -> watch::Receiver<SubscriptionStatus> {
        self.status.clone()
    }
}

impl Stream for ChangeStream {
    type Item = ChangeFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_frames() {
        assert_eq!(ChangeFrame::Change.wire(), "event: change\ndata: update\n\n");
        assert_eq!(ChangeFrame::KeepAlive.wire(), ": keep-alive\n\n");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Closing).unwrap(),
            "\"closing\""
        );
    }
}
