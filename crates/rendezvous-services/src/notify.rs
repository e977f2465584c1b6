//! Notify board: one-shot "fromId wants to connect to toId" tokens.

use std::sync::Arc;

use dashmap::DashSet;

use rendezvous_core::directory::require;
use rendezvous_core::{NotifyRequest, ValidationError};

#[derive(Clone, Default)]
pub struct NotifyBoard {
    /// (fromId, toId)
    tokens: Arc<DashSet<(String, String)>>,
}

impl NotifyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token. Posting the same pair again before it is consumed is a no-op.
    pub fn post(&self, req: NotifyRequest) -> Result<(), ValidationError> {
        let from_id = require("fromId", req.from_id)?;
        let to_id = require("toId", req.to_id)?;
        tracing::info!(from = %from_id, to = %to_id, "notify posted");
        self.tokens.insert((from_id, to_id));
        Ok(())
    }

    /// Remove the token if present. Returns true to exactly one caller per post.
    pub fn consume(&self, from_id: &str, to_id: &str) -> bool {
        self.tokens
            .remove(&(from_id.to_string(), to_id.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
