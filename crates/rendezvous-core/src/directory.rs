//! JSON bodies of the directory HTTP surface.
//!
//! Field names follow the wire (`name`, `pubKey`, `fromId`, `wantsToConnect`).
//! Absent optional fields are omitted on output.

use serde::{Deserialize, Serialize};

/// `POST /register` body. Everything is optional at the JSON level so that
/// missing fields surface as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "pubKey", skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

/// `POST /notify` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
}

/// `{ "ok": true }`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: OkResponse = OkResponse { ok: true };
}

/// Redacted view of a directory record; `lastSeenAt` is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(rename = "pubKey", default, skip_serializing_if = "Option::is_none")]
    pub pub_key: Option<String>,
}

/// A peer as returned by `/peers_with_notify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerNotifyView {
    #[serde(flatten)]
    pub peer: PeerView,
    pub wants_to_connect: bool,
}

/// `{ "peers": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersResponse<T> {
    pub peers: Vec<T>,
}

/// `GET /status` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub peers: usize,
    pub notify_tokens: usize,
    pub awaiting_relays: usize,
    pub signaling_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),
}

/// Returns the string if present and non-empty.
pub fn require(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingField(field))
}
