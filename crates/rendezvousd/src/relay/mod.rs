//! Raw TCP rendezvous relay.
//!
//! Each client announces `{"id","token"}` on its first line. Two clients whose
//! declarations are mutual are acknowledged with `{"paired":true}` and spliced
//! together; anything else waits in the awaiting table until matched or closed.

pub mod declaration;
pub mod splice;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;

use rendezvous_core::config::RelayConfig;
use rendezvous_core::RelayDeclaration;
use rendezvous_services::{AwaitingTable, ConnId, RelayHandoff, Rendezvous};

use declaration::read_declaration;

/// Bytes a waiting connection may send before it is paired.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct RelayServer {
    table: AwaitingTable<RelayHandoff>,
    config: RelayConfig,
    next_conn: Arc<AtomicU64>,
}

/// Why a waiting connection stopped waiting without being paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Abandoned {
    Closed,
    TimedOut,
    Overflow,
}

impl RelayServer {
    pub fn new(table: AwaitingTable<RelayHandoff>, config: RelayConfig) -> Self {
        Self {
            table,
            config,
            next_conn: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Accept relay clients until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "relay listening");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("relay listener shutting down");
                    return Ok(());
                }

                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(a) => a,
                        Err(e) => {
                            tracing::warn!(error = %e, "relay accept failed");
                            continue;
                        }
                    };
                    let conn_id = self.next_conn.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(conn = conn_id, %peer_addr, "relay connection accepted");

                    let server = self.clone();
                    tokio::spawn(async move { server.handle_connection(stream, conn_id).await });
                }
            }
        }
    }

    async fn handle_connection(self, mut stream: TcpStream, conn_id: ConnId) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(conn = conn_id, error = %e, "set_nodelay failed");
        }

        let (decl, pending) =
            match read_declaration(&mut stream, self.config.max_declaration_bytes).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!(conn = conn_id, error = %e, "bad relay declaration, closing");
                    return;
                }
            };

        if decl.is_self_pairing() && self.config.reject_self_pairing {
            tracing::info!(conn = conn_id, id = %decl.id, "self-pairing declaration rejected");
            return;
        }

        tracing::info!(conn = conn_id, id = %decl.id, token = %decl.token, "relay declaration");

        let mut next = Some((
            RelayHandoff {
                conn_id,
                stream,
                pending,
                peer_id: decl.id.clone(),
            },
            decl,
        ));
        while let Some((handoff, decl)) = next.take() {
            next = self.announce(handoff, decl).await;
        }
    }

    /// Pair `own` with a waiting counterpart, or wait for one.
    ///
    /// Returns a connection this task must announce next: a counterpart that
    /// claimed our entry in the same instant we gave up on it.
    async fn announce(
        &self,
        mut own: RelayHandoff,
        decl: RelayDeclaration,
    ) -> Option<(RelayHandoff, RelayDeclaration)> {
        loop {
            match self.table.match_or_wait(&decl, own.conn_id).await {
                Rendezvous::Matched(waiting) => {
                    let waiting_conn = waiting.conn_id;
                    match waiting.handoff.send(own) {
                        Ok(()) => {
                            tracing::info!(
                                id = %decl.id,
                                token = %decl.token,
                                waiting = waiting_conn,
                                "relay paired"
                            );
                            return None;
                        }
                        // The waiting side left between our claim and the send.
                        Err(returned) => own = returned,
                    }
                }
                Rendezvous::Waiting(rx) => return self.wait(own, rx, decl).await,
            }
        }
    }

    async fn wait(
        &self,
        mut own: RelayHandoff,
        mut rx: oneshot::Receiver<RelayHandoff>,
        decl: RelayDeclaration,
    ) -> Option<(RelayHandoff, RelayDeclaration)> {
        let conn_id = own.conn_id;
        let deadline = self.config.await_timeout().map(|t| Instant::now() + t);
        let mut claimable = true;
        let mut buf = vec![0u8; 4096];

        let abandoned = loop {
            tokio::select! {
                handoff = &mut rx, if claimable => match handoff {
                    Ok(arriving) => {
                        let arriving_conn = arriving.conn_id;
                        tracing::debug!(
                            conn = conn_id,
                            peer = arriving_conn,
                            peer_id = %arriving.peer_id,
                            pending = own.pending.len() + arriving.pending.len(),
                            "splicing relay pair"
                        );
                        match splice::splice(own, arriving).await {
                            Ok(stats) => tracing::info!(
                                id = %decl.id,
                                token = %decl.token,
                                conn = conn_id,
                                peer = arriving_conn,
                                sent = stats.waiting_to_arriving,
                                received = stats.arriving_to_waiting,
                                "relay session ended"
                            ),
                            Err(e) => tracing::debug!(
                                conn = conn_id,
                                peer = arriving_conn,
                                error = %e,
                                "relay session ended with error"
                            ),
                        }
                        return None;
                    }
                    Err(_) => {
                        // Superseded by a duplicate declaration; nothing can match us now.
                        claimable = false;
                    }
                },

                read = own.stream.read(&mut buf) => match read {
                    Ok(0) | Err(_) => break Abandoned::Closed,
                    Ok(n) => {
                        if own.pending.len() + n > MAX_PENDING_BYTES {
                            break Abandoned::Overflow;
                        }
                        own.pending.extend_from_slice(&buf[..n]);
                    }
                },

                _ = sleep_until(deadline), if deadline.is_some() => break Abandoned::TimedOut,
            }
        };

        self.give_up(rx, &decl, conn_id, abandoned).await
    }

    /// Drop our awaiting entry. A counterpart that claimed it just before the
    /// close is returned with its own declaration so it can be re-announced.
    async fn give_up(
        &self,
        mut rx: oneshot::Receiver<RelayHandoff>,
        decl: &RelayDeclaration,
        conn_id: ConnId,
        abandoned: Abandoned,
    ) -> Option<(RelayHandoff, RelayDeclaration)> {
        rx.close();
        let removed = self.table.remove_if_owned(&decl.waiting_key(), conn_id).await;
        tracing::debug!(
            conn = conn_id,
            id = %decl.id,
            token = %decl.token,
            reason = ?abandoned,
            removed,
            "relay connection left unpaired"
        );

        rx.try_recv().ok().map(|arriving| {
            let redecl = RelayDeclaration {
                id: decl.token.clone(),
                token: decl.id.clone(),
            };
            (arriving, redecl)
        })
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}
