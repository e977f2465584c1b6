//! Peer directory: last-known address of every registered peer.
//!
//! Expiry is enforced at read time only: a list call prunes every record
//! idle longer than the threshold before building its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use rendezvous_core::directory::{require, PeerNotifyView, PeerView};
use rendezvous_core::{RegisterRequest, ValidationError};

use crate::NotifyBoard;

/// A registered peer.
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub host: String,
    pub port: u16,
    /// Opaque; stored and returned exactly as the peer sent it.
    pub public_key: Option<String>,
    pub last_seen_at: Instant,
    /// Position of the id's first insertion, kept across upserts.
    seq: u64,
}

impl PeerRecord {
    pub fn view(&self) -> PeerView {
        PeerView {
            id: self.id.clone(),
            name: self.display_name.clone(),
            host: self.host.clone(),
            port: self.port,
            pub_key: self.public_key.clone(),
        }
    }

    fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        now.saturating_duration_since(self.last_seen_at) > stale_after
    }
}

#[derive(Clone)]
pub struct PeerDirectory {
    records: Arc<DashMap<String, PeerRecord>>,
    next_seq: Arc<AtomicU64>,
    stale_after: Duration,
}

impl PeerDirectory {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Upsert a peer. `id`, `host` and a non-zero `port` are required.
    pub fn register(&self, req: RegisterRequest) -> Result<(), ValidationError> {
        self.register_at(req, Instant::now())
    }

    pub fn register_at(&self, req: RegisterRequest, now: Instant) -> Result<(), ValidationError> {
        let id = require("id", req.id)?;
        let host = require("host", req.host)?;
        let port = req
            .port
            .filter(|p| *p != 0)
            .ok_or(ValidationError::MissingField("port"))?;

        let record = |seq| PeerRecord {
            id: id.clone(),
            display_name: req.name.clone(),
            host: host.clone(),
            port,
            public_key: req.pub_key.clone(),
            last_seen_at: now,
            seq,
        };

        match self.records.entry(id.clone()) {
            Entry::Occupied(mut e) => {
                let seq = e.get().seq;
                e.insert(record(seq));
            }
            Entry::Vacant(e) => {
                e.insert(record(self.next_seq.fetch_add(1, Ordering::Relaxed)));
            }
        }
        Ok(())
    }

    /// Every live peer except `excluding`, pruning stale records first.
    pub fn list(&self, excluding: Option<&str>) -> Vec<PeerView> {
        self.list_at(excluding, Instant::now())
    }

    pub fn list_at(&self, excluding: Option<&str>, now: Instant) -> Vec<PeerView> {
        self.live_records(excluding, now)
            .iter()
            .map(PeerRecord::view)
            .collect()
    }

    /// Like [`list`](Self::list), and consumes any token a listed peer posted
    /// for `excluding`, reporting it as `wantsToConnect`.
    pub fn list_with_notify(&self, excluding: Option<&str>, notify: &NotifyBoard) -> Vec<PeerNotifyView> {
        self.list_with_notify_at(excluding, notify, Instant::now())
    }

    pub fn list_with_notify_at(
        &self,
        excluding: Option<&str>,
        notify: &NotifyBoard,
        now: Instant,
    ) -> Vec<PeerNotifyView> {
        self.live_records(excluding, now)
            .iter()
            .map(|record| PeerNotifyView {
                peer: record.view(),
                wants_to_connect: excluding
                    .map(|me| notify.consume(&record.id, me))
                    .unwrap_or(false),
            })
            .collect()
    }

    /// Records currently held, stale ones included until the next read.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn live_records(&self, excluding: Option<&str>, now: Instant) -> Vec<PeerRecord> {
        let stale_after = self.stale_after;
        self.records.retain(|id, record| {
            let stale = record.is_stale(now, stale_after);
            if stale {
                tracing::debug!(peer = %id, "pruned stale directory entry");
            }
            !stale
        });

        let mut live: Vec<PeerRecord> = self
            .records
            .iter()
            .filter(|e| Some(e.key().as_str()) != excluding)
            .map(|e| e.value().clone())
            .collect();
        live.sort_by_key(|r| r.seq);
        live
    }
}
