//! Signaling hub: WebSocket connections exchanging opaque negotiation payloads.

mod hub;

pub use hub::SignalingHub;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;

/// Every path upgrades to the hub.
pub fn router(hub: SignalingHub) -> Router {
    Router::new().fallback(handle_upgrade).with_state(hub)
}

async fn handle_upgrade(ws: WebSocketUpgrade, State(hub): State<SignalingHub>) -> Response {
    ws.on_upgrade(move |socket| hub.handle_socket(socket))
}

pub async fn serve_on(listener: TcpListener, hub: SignalingHub) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "signaling hub listening");
    axum::serve(listener, router(hub)).await?;
    Ok(())
}
