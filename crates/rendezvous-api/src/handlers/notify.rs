//! /notify handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use rendezvous_core::directory::OkResponse;
use rendezvous_core::NotifyRequest;

use super::{bad_request, decode_body, ApiError, ApiState};

pub async fn handle_notify(
    State(state): State<ApiState>,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let req = decode_body(payload)?;
    state.notify.post(req).map_err(bad_request)?;
    Ok(Json(OkResponse::OK))
}
