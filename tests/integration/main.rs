//! Rendezvous integration test harness.
//!
//! `directory` tests drive the HTTP surface in-process on an ephemeral port.
//! `daemon` tests spawn the built `rendezvousd` binary and skip gracefully
//! when it has not been built yet:
//!
//!   cargo build -p rendezvousd
//!   cargo test --test integration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::net::TcpListener;

use rendezvous_api::ApiState;
use rendezvous_services::{AwaitingTable, NotifyBoard, PeerDirectory, SignalingSessions};

mod daemon;
mod directory;

// ── Harness ───────────────────────────────────────────────────────────────────

/// A directory API served in-process.
pub struct TestApi {
    pub base: String,
    pub state: ApiState,
}

/// Serve the directory API on 127.0.0.1 with an ephemeral port.
pub async fn start_api(stale_after: Duration) -> TestApi {
    let state = ApiState {
        directory: PeerDirectory::new(stale_after),
        notify: NotifyBoard::new(),
        awaiting: AwaitingTable::new(),
        signaling: SignalingSessions::new(),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(rendezvous_api::serve_on(listener, state.clone()));
    TestApi {
        base: format!("http://{addr}"),
        state,
    }
}

pub async fn api_get(base: &str, path: &str) -> Result<Value> {
    let resp = reqwest::get(format!("{base}{path}"))
        .await
        .with_context(|| format!("GET {path} failed"))?;
    if !resp.status().is_success() {
        bail!("GET {path} returned {}", resp.status());
    }
    Ok(resp.json().await?)
}

/// POST a raw body; returns the status code and body text.
pub async fn api_post_raw(base: &str, path: &str, body: &str) -> Result<(u16, String)> {
    let resp = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .with_context(|| format!("POST {path} failed"))?;
    let status = resp.status().as_u16();
    Ok((status, resp.text().await?))
}

pub async fn api_post(base: &str, path: &str, body: Value) -> Result<(u16, String)> {
    api_post_raw(base, path, &body.to_string()).await
}

/// Ids of a `{ "peers": [...] }` body, in order.
pub fn peer_ids(body: &Value) -> Vec<String> {
    body["peers"]
        .as_array()
        .map(|peers| {
            peers
                .iter()
                .filter_map(|p| p["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Path to the built daemon, if present.
pub fn daemon_binary() -> Option<PathBuf> {
    let target = std::env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target"));
    ["debug", "release"]
        .iter()
        .map(|profile| target.join(profile).join("rendezvousd"))
        .find(|p| p.exists())
}

/// Reserve a free loopback port. The listener is dropped before returning.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `GET /status` until the daemon answers.
pub async fn wait_for_api(base: &str, attempts: u32) -> Result<()> {
    for _ in 0..attempts {
        if api_get(base, "/status").await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    bail!("directory API at {base} did not come up")
}

pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
