//! Relay awaiting table: connections that declared "I am X, I want Y" and
//! have no counterpart yet.
//!
//! The waiting connection's own task keeps its socket; the table only holds
//! a one-shot handoff channel. A counterpart that claims the entry sends its
//! half of the pairing through that channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};

use rendezvous_core::RelayDeclaration;

/// Per-process connection identity, used to remove only our own entry.
pub type ConnId = u64;

/// (requesterId, wantedId)
pub type PairKey = (String, String);

/// What an arriving relay connection hands to the connection it matched.
#[derive(Debug)]
pub struct RelayHandoff {
    pub conn_id: ConnId,
    pub stream: TcpStream,
    /// Bytes already read past the declaration line.
    pub pending: Vec<u8>,
    /// The arriving side's declared id.
    pub peer_id: String,
}

pub struct Waiting<T> {
    pub conn_id: ConnId,
    pub handoff: oneshot::Sender<T>,
}

/// Outcome of announcing a declaration.
pub enum Rendezvous<T> {
    /// A mutual counterpart was waiting; its entry has been removed.
    Matched(Waiting<T>),
    /// Nobody was waiting; this connection is now stored under its own key.
    Waiting(oneshot::Receiver<T>),
}

pub struct AwaitingTable<T> {
    entries: Arc<Mutex<HashMap<PairKey, Waiting<T>>>>,
}

impl<T> Clone for AwaitingTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for AwaitingTable<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> AwaitingTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the complementary entry or start waiting, as one critical section.
    ///
    /// A second declaration of an already-waiting key replaces the entry; the
    /// superseded connection is left open and will never be matched.
    pub async fn match_or_wait(&self, decl: &RelayDeclaration, conn_id: ConnId) -> Rendezvous<T> {
        let mut entries = self.entries.lock().await;

        if let Some(waiting) = entries.remove(&decl.complement_key()) {
            return Rendezvous::Matched(waiting);
        }

        let (handoff, rx) = oneshot::channel();
        if let Some(previous) = entries.insert(decl.waiting_key(), Waiting { conn_id, handoff }) {
            tracing::warn!(
                id = %decl.id,
                token = %decl.token,
                superseded = previous.conn_id,
                conn = conn_id,
                "duplicate relay declaration, earlier connection orphaned"
            );
        }
        Rendezvous::Waiting(rx)
    }

    /// Remove `key` only if it still belongs to `conn_id`.
    pub async fn remove_if_owned(&self, key: &PairKey, conn_id: ConnId) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(w) if w.conn_id == conn_id => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
