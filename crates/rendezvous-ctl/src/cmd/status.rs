//! Daemon table counts.

use anyhow::Result;

use rendezvous_core::directory::StatusResponse;

use super::http::get_json;

pub async fn cmd_status(server: &str) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", server)).await?;

    println!("═══════════════════════════════════════");
    println!("  Rendezvous Status");
    println!("═══════════════════════════════════════");
    println!("  Directory peers    : {}", resp.peers);
    println!("  Notify tokens      : {}", resp.notify_tokens);
    println!("  Awaiting relays    : {}", resp.awaiting_relays);
    println!("  Signaling sessions : {}", resp.signaling_sessions);

    Ok(())
}
