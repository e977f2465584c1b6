//! /status handler. Counts only; never prunes the directory.

use axum::extract::State;
use axum::Json;

use rendezvous_core::directory::StatusResponse;

use super::ApiState;

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        peers: state.directory.len(),
        notify_tokens: state.notify.len(),
        awaiting_relays: state.awaiting.len().await,
        signaling_sessions: state.signaling.len(),
    })
}
