pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// The directory surface: register, peers, peers_with_notify, notify, status.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/register", post(handlers::handle_register))
        .route("/peers", get(handlers::handle_peers))
        .route("/peers_with_notify", get(handlers::handle_peers_with_notify))
        .route("/notify", post(handlers::handle_notify))
        .route("/status", get(handlers::handle_status))
        .with_state(state)
        .layer(cors)
}

/// Serve on an already-bound listener.
pub async fn serve_on(listener: TcpListener, state: ApiState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "directory API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
