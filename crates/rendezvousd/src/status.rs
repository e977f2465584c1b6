//! Periodic table snapshot in the log.

use std::time::Duration;

use rendezvous_services::{AwaitingTable, NotifyBoard, PeerDirectory, RelayHandoff, SignalingSessions};

pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn snapshot_loop(
    directory: PeerDirectory,
    notify: NotifyBoard,
    awaiting: AwaitingTable<RelayHandoff>,
    signaling: SignalingSessions,
) {
    let mut interval = tokio::time::interval(SNAPSHOT_INTERVAL);
    interval.tick().await;

    loop {
        interval.tick().await;
        let awaiting_relays = awaiting.len().await;
        tracing::info!(
            peers = directory.len(),
            notify_tokens = notify.len(),
            awaiting_relays,
            signaling_sessions = signaling.len(),
            "table snapshot"
        );
    }
}
