//! Snapshot channel for live attendance updates.
//!
//! A producer publishes whole record snapshots; consumers read the latest one
//! whenever they choose. Consumers stop listening by dropping their receiver.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

use crate::models::AttendanceRecord;
use crate::source;

pub type Snapshot = Arc<Vec<AttendanceRecord>>;

#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    tx: Arc<watch::Sender<Snapshot>>,
}

#[derive(Debug, Clone)]
pub struct SnapshotReceiver {
    rx: watch::Receiver<Snapshot>,
}

pub fn snapshot_channel(initial: Vec<AttendanceRecord>) -> (SnapshotPublisher, SnapshotReceiver) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (
        SnapshotPublisher { tx: Arc::new(tx) },
        SnapshotReceiver { rx },
    )
}

impl SnapshotPublisher {
    /// Returns false once every receiver has been dropped.
    pub fn publish(&self, records: Vec<AttendanceRecord>) -> bool {
        self.tx.send(Arc::new(records)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        SnapshotReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl SnapshotReceiver {
    pub fn latest(&self) -> Snapshot {
        Arc::clone(&self.rx.borrow())
    }

    /// Waits for a newer snapshot. Returns None when the publisher is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}

pub fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Polls `path` and publishes a new snapshot whenever its modification time
/// differs from `last_seen`, which should be taken before the initial load.
/// Ends once no receiver is left.
pub async fn watch_file(
    path: PathBuf,
    mut last_seen: Option<SystemTime>,
    interval: Duration,
    publisher: SnapshotPublisher,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if publisher.is_closed() {
            tracing::debug!(path = %path.display(), "no snapshot consumers left, stopping watcher");
            break;
        }

        let current = modified_at(&path);
        if current == last_seen {
            continue;
        }
        last_seen = current;

        match source::load_records(&path) {
            Ok(records) => {
                tracing::info!(count = records.len(), "live update received");
                if !publisher.publish(records) {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "live update failed, keeping previous snapshot");
            }
        }
    }
}
