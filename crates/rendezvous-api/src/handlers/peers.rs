//! /register, /peers and /peers_with_notify handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use rendezvous_core::directory::{OkResponse, PeerNotifyView, PeersResponse};
use rendezvous_core::{PeerView, RegisterRequest};

use super::{bad_request, decode_body, ApiError, ApiState};

// ── /register (POST) ──────────────────────────────────────────────────────────

pub async fn handle_register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let req = decode_body(payload)?;
    let summary = format!(
        "{} {} {}:{}",
        req.id.as_deref().unwrap_or_default(),
        req.name.as_deref().unwrap_or_default(),
        req.host.as_deref().unwrap_or_default(),
        req.port.unwrap_or_default(),
    );

    state.directory.register(req).map_err(|e| {
        tracing::debug!(error = %e, "register rejected");
        bad_request(e)
    })?;

    tracing::info!(peer = %summary, "register");
    Ok(Json(OkResponse::OK))
}

// ── /peers, /peers_with_notify (GET) ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct PeersQuery {
    /// The caller's own id; excluded from the result.
    pub id: Option<String>,
}

pub async fn handle_peers(
    State(state): State<ApiState>,
    Query(query): Query<PeersQuery>,
) -> Json<PeersResponse<PeerView>> {
    let peers = state.directory.list(query.id.as_deref());
    Json(PeersResponse { peers })
}

pub async fn handle_peers_with_notify(
    State(state): State<ApiState>,
    Query(query): Query<PeersQuery>,
) -> Json<PeersResponse<PeerNotifyView>> {
    let peers = state
        .directory
        .list_with_notify(query.id.as_deref(), &state.notify);

    let flagged = peers.iter().filter(|p| p.wants_to_connect).count();
    if flagged > 0 {
        tracing::debug!(id = ?query.id, flagged, "delivered notify tokens");
    }

    Json(PeersResponse { peers })
}
