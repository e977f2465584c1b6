//! Signaling session table: which live connection answers to which peer id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use rendezvous_core::SignalDelivery;

use crate::ConnId;

/// Outbound frames queued per connection before it is considered stalled.
pub const OUTBOUND_QUEUE: usize = 64;

pub struct SignalingSession {
    pub conn_id: ConnId,
    pub outbound: mpsc::Sender<SignalDelivery>,
}

/// What happened to a forwarded signal. None of these are reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// No session registered under the target id.
    Offline,
    /// The target's connection has gone away.
    Closed,
    /// The target's outbound queue is full.
    Congested,
}

#[derive(Clone, Default)]
pub struct SignalingSessions {
    sessions: Arc<DashMap<String, SignalingSession>>,
}

impl SignalingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to a connection. Returns the connection it replaced, if any.
    /// The replaced connection is left open.
    pub fn register(
        &self,
        id: String,
        conn_id: ConnId,
        outbound: mpsc::Sender<SignalDelivery>,
    ) -> Option<ConnId> {
        self.sessions
            .insert(id, SignalingSession { conn_id, outbound })
            .map(|prev| prev.conn_id)
            .filter(|prev| *prev != conn_id)
    }

    /// Best-effort, at-most-once forward to `target`.
    pub fn deliver(&self, target: &str, frame: SignalDelivery) -> Delivery {
        let Some(session) = self.sessions.get(target) else {
            return Delivery::Offline;
        };
        match session.outbound.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
            Err(TrySendError::Full(_)) => Delivery::Congested,
        }
    }

    /// Remove `id` only if it still points at `conn_id`.
    pub fn remove_if_owned(&self, id: &str, conn_id: ConnId) -> bool {
        self.sessions
            .remove_if(id, |_, session| session.conn_id == conn_id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
