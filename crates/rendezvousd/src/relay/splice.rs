//! Joining two paired relay connections.

use tokio::io::AsyncWriteExt;

use rendezvous_core::wire::paired_line;
use rendezvous_services::RelayHandoff;

/// Bytes forwarded in each direction before the session ended.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpliceStats {
    pub waiting_to_arriving: u64,
    pub arriving_to_waiting: u64,
}

/// Acknowledge both sides, flush held bytes across, then copy in both
/// directions until either side finishes. Both sockets close on return.
pub async fn splice(waiting: RelayHandoff, arriving: RelayHandoff) -> std::io::Result<SpliceStats> {
    let (mut w_read, mut w_write) = waiting.stream.into_split();
    let (mut a_read, mut a_write) = arriving.stream.into_split();

    w_write.write_all(paired_line()).await?;
    a_write.write_all(paired_line()).await?;

    let mut stats = SpliceStats {
        waiting_to_arriving: waiting.pending.len() as u64,
        arriving_to_waiting: arriving.pending.len() as u64,
    };
    if !waiting.pending.is_empty() {
        a_write.write_all(&waiting.pending).await?;
    }
    if !arriving.pending.is_empty() {
        w_write.write_all(&arriving.pending).await?;
    }

    let forward = tokio::io::copy(&mut w_read, &mut a_write);
    let backward = tokio::io::copy(&mut a_read, &mut w_write);

    tokio::select! {
        r = forward => {
            let n = r?;
            stats.waiting_to_arriving += n;
            tracing::debug!(conn = waiting.conn_id, bytes = n, "waiting side finished");
        }
        r = backward => {
            let n = r?;
            stats.arriving_to_waiting += n;
            tracing::debug!(conn = arriving.conn_id, bytes = n, "arriving side finished");
        }
    }

    Ok(stats)
}
