//! Register, peers, poll and notify commands.

use anyhow::{Context, Result, bail};

use rendezvous_core::directory::{OkResponse, PeerNotifyView, PeersResponse};
use rendezvous_core::{NotifyRequest, PeerView, RegisterRequest};

use super::http::{get_json, post_json_body};

pub async fn cmd_register(server: &str, args: &[&str]) -> Result<()> {
    let [id, host, port, rest @ ..] = args else {
        bail!("register requires <id> <host> <port> [name] [pubKey]");
    };
    if rest.len() > 2 {
        bail!("register takes at most 5 arguments");
    }
    let port: u16 = port.parse().context("port must be a number")?;
    let req = RegisterRequest {
        id: Some(id.to_string()),
        name: rest.first().map(|s| s.to_string()),
        host: Some(host.to_string()),
        port: Some(port),
        pub_key: rest.get(1).map(|s| s.to_string()),
    };
    let _: OkResponse = post_json_body(&format!("{}/register", server), &req).await?;
    println!("Registered {} at {}:{}", id, host, port);
    Ok(())
}

/// `<server>/<path>?id=<id>` with the id form-encoded.
fn peers_url(server: &str, path: &str, id: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse_with_params(&format!("{}/{}", server, path), [("id", id)])
        .with_context(|| format!("invalid server url {}", server))
}

pub async fn cmd_peers(server: &str, id: &str) -> Result<()> {
    let resp: PeersResponse<PeerView> =
        get_json(peers_url(server, "peers", id)?.as_str()).await?;

    if resp.peers.is_empty() {
        println!("No other peers registered.");
        return Ok(());
    }
    for p in &resp.peers {
        print_peer(p, None);
    }
    Ok(())
}

/// Like `peers`, but consumes any connect requests addressed to `id`.
pub async fn cmd_poll(server: &str, id: &str) -> Result<()> {
    let resp: PeersResponse<PeerNotifyView> =
        get_json(peers_url(server, "peers_with_notify", id)?.as_str()).await?;

    if resp.peers.is_empty() {
        println!("No other peers registered.");
        return Ok(());
    }
    for p in &resp.peers {
        print_peer(&p.peer, Some(p.wants_to_connect));
    }
    Ok(())
}

pub async fn cmd_notify(server: &str, from_id: &str, to_id: &str) -> Result<()> {
    let req = NotifyRequest {
        from_id: Some(from_id.to_string()),
        to_id: Some(to_id.to_string()),
    };
    let _: OkResponse = post_json_body(&format!("{}/notify", server), &req).await?;
    println!("{} will see a connect request from {} on its next poll.", to_id, from_id);
    Ok(())
}

fn print_peer(p: &PeerView, wants_to_connect: Option<bool>) {
    println!("  ┌─ {}", p.id);
    if let Some(name) = &p.name {
        println!("  │  name     : {}", name);
    }
    if let Some(key) = &p.pub_key {
        println!("  │  pubKey   : {}", key);
    }
    if let Some(wants) = wants_to_connect {
        println!("  │  connect  : {}", if wants { "requested" } else { "-" });
    }
    println!("  └─ addr     : {}:{}", p.host, p.port);
}
