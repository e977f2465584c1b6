//! HTTP API handlers: the peer directory and notify board as JSON.

pub mod notify;
pub mod peers;
pub mod status;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;

use rendezvous_core::ValidationError;
use rendezvous_services::{AwaitingTable, NotifyBoard, PeerDirectory, RelayHandoff, SignalingSessions};

#[derive(Clone)]
pub struct ApiState {
    pub directory: PeerDirectory,
    pub notify: NotifyBoard,
    /// Read only, for /status.
    pub awaiting: AwaitingTable<RelayHandoff>,
    /// Read only, for /status.
    pub signaling: SignalingSessions,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

type ApiError = (StatusCode, String);

/// Any undecodable body is a bad request, same as a missing field.
fn decode_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| (StatusCode::BAD_REQUEST, rejection.body_text()))
}

fn bad_request(err: ValidationError) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

// Re-export handler functions for use in router setup.
pub use notify::handle_notify;
pub use peers::{handle_peers, handle_peers_with_notify, handle_register};
pub use status::handle_status;
