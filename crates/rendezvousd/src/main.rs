//! rendezvousd: the rendezvous daemon.
//!
//! Usage: rendezvousd [httpPort] [relayPort] [signalingPort]

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use rendezvous_core::config::RendezvousConfig;
use rendezvous_services::{AwaitingTable, NotifyBoard, PeerDirectory, SignalingSessions};

mod relay;
mod signaling;
mod status;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = RendezvousConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = RendezvousConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        RendezvousConfig::default()
    });
    let args: Vec<String> = std::env::args().skip(1).collect();
    config
        .apply_port_args(&args)
        .context("usage: rendezvousd [httpPort] [relayPort] [signalingPort]")?;

    let net = &config.network;
    tracing::info!(
        bind = %net.bind_addr,
        http_port = net.http_port,
        relay_port = net.relay_port,
        signaling_port = net.signaling_port,
        stale_after_secs = config.directory.stale_after_secs,
        "rendezvousd starting"
    );
    if config.relay.await_timeout().is_some() || config.relay.reject_self_pairing {
        tracing::info!(
            await_timeout_secs = config.relay.await_timeout_secs,
            reject_self_pairing = config.relay.reject_self_pairing,
            "relay hardening enabled"
        );
    }

    // Shared state
    let directory = PeerDirectory::new(config.directory.stale_after());
    let notify = NotifyBoard::new();
    let awaiting = AwaitingTable::new();
    let sessions = SignalingSessions::new();

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Bind listeners ───────────────────────────────────────────────────────

    let relay_listener = TcpListener::bind((net.bind_addr.as_str(), net.relay_port))
        .await
        .context("failed to bind relay listener")?;
    let api_listener = TcpListener::bind((net.bind_addr.as_str(), net.http_port))
        .await
        .context("failed to bind directory API listener")?;
    let signaling_listener = if config.signaling.enabled {
        Some(
            TcpListener::bind((net.bind_addr.as_str(), net.signaling_port))
                .await
                .context("failed to bind signaling listener")?,
        )
    } else {
        tracing::info!("signaling hub disabled");
        None
    };

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let relay_task = tokio::spawn(
        relay::RelayServer::new(awaiting.clone(), config.relay.clone())
            .run(relay_listener, shutdown_tx.subscribe()),
    );

    let api_task = {
        let state = rendezvous_api::ApiState {
            directory: directory.clone(),
            notify: notify.clone(),
            awaiting: awaiting.clone(),
            signaling: sessions.clone(),
        };
        tokio::spawn(rendezvous_api::serve_on(api_listener, state))
    };

    let signaling_task = {
        let hub = signaling::SignalingHub::new(sessions.clone());
        tokio::spawn(async move {
            match signaling_listener {
                Some(listener) => signaling::serve_on(listener, hub).await,
                None => std::future::pending().await,
            }
        })
    };

    let snapshot_task = tokio::spawn(status::snapshot_loop(
        directory,
        notify,
        awaiting,
        sessions,
    ));

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        r = relay_task         => tracing::error!("relay listener exited: {:?}", r),
        r = api_task           => tracing::error!("directory API exited: {:?}", r),
        r = signaling_task     => tracing::error!("signaling hub exited: {:?}", r),
        r = snapshot_task      => tracing::error!("snapshot task exited: {:?}", r),
    }

    Ok(())
}
