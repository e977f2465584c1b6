//! Per-connection signaling loop.
//!
//! A connection may `register` an id and `signal` any id. Signals are
//! forwarded at most once to whichever connection currently holds the target
//! id; offline targets drop them without telling the sender. A frame that does
//! not decode ends the connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use rendezvous_core::{ClientFrame, SignalDelivery};
use rendezvous_services::signaling::OUTBOUND_QUEUE;
use rendezvous_services::{ConnId, Delivery, SignalingSessions};

#[derive(Clone)]
pub struct SignalingHub {
    sessions: SignalingSessions,
    next_conn: Arc<AtomicU64>,
}

/// State owned by one connection's task.
struct Connection {
    conn_id: ConnId,
    outbound: mpsc::Sender<SignalDelivery>,
    /// Id used as `from` on outgoing signals.
    current_id: Option<String>,
    /// Every id this connection has claimed, cleaned up on close.
    registered: Vec<String>,
}

impl SignalingHub {
    pub fn new(sessions: SignalingSessions) -> Self {
        Self {
            sessions,
            next_conn: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn handle_socket(self, socket: WebSocket) {
        let conn_id = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let (outbound, mut inbox) = mpsc::channel(OUTBOUND_QUEUE);
        let mut conn = Connection {
            conn_id,
            outbound,
            current_id: None,
            registered: Vec::new(),
        };
        let (mut sink, mut stream) = socket.split();
        tracing::debug!(conn = conn_id, "signaling connection opened");

        loop {
            tokio::select! {
                Some(delivery) = inbox.recv() => {
                    let text = match serde_json::to_string(&delivery) {
                        Ok(t) => t,
                        Err(e) => {
                            tracing::warn!(conn = conn_id, error = %e, "failed to encode signal");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }

                msg = stream.next() => {
                    let raw = match msg {
                        Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                        Some(Ok(Message::Binary(data))) => data.to_vec(),
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!(conn = conn_id, error = %e, "signaling read failed");
                            break;
                        }
                    };
                    if let Err(e) = self.handle_frame(&mut conn, &raw) {
                        tracing::debug!(conn = conn_id, error = %e, "malformed signaling frame, closing");
                        break;
                    }
                }
            }
        }

        for id in &conn.registered {
            if self.sessions.remove_if_owned(id, conn_id) {
                tracing::debug!(conn = conn_id, id = %id, "signaling session removed");
            }
        }
        tracing::debug!(conn = conn_id, "signaling connection closed");
    }

    fn handle_frame(&self, conn: &mut Connection, raw: &[u8]) -> Result<(), serde_json::Error> {
        match serde_json::from_slice::<ClientFrame>(raw)? {
            ClientFrame::Register { id } => {
                let replaced =
                    self.sessions
                        .register(id.clone(), conn.conn_id, conn.outbound.clone());
                tracing::debug!(id = %id, conn = conn.conn_id, ?replaced, "signaling id registered");
                if !conn.registered.contains(&id) {
                    conn.registered.push(id.clone());
                }
                conn.current_id = Some(id);
            }
            ClientFrame::Signal { target, signal } => {
                let delivery = SignalDelivery {
                    from: conn.current_id.clone(),
                    signal,
                };
                let from = conn.current_id.as_deref().unwrap_or("-");
                match self.sessions.deliver(&target, delivery) {
                    Delivery::Queued => tracing::debug!(from, target = %target, "signal forwarded"),
                    dropped => {
                        tracing::debug!(from, target = %target, reason = ?dropped, "signal dropped");
                    }
                }
            }
        }
        Ok(())
    }
}
