//! Relay pipe: stdin/stdout spliced to a remote peer through the daemon.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use rendezvous_core::RelayDeclaration;
use rendezvous_core::wire::RelayAck;

/// Declare on the relay, wait for the pairing, then pipe stdin/stdout through it.
pub async fn cmd_relay(relay: &str, id: &str, target: &str) -> Result<()> {
    let mut stream = TcpStream::connect(relay)
        .await
        .with_context(|| format!("failed to connect to relay at {}", relay))?;
    let decl = RelayDeclaration {
        id: id.to_string(),
        token: target.to_string(),
    };
    stream.write_all(&decl.to_line()).await?;
    eprintln!("Waiting for {} on {} ...", target, relay);

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        bail!("relay closed the connection without pairing");
    }
    let ack: RelayAck = serde_json::from_str(line.trim()).context("unexpected relay reply")?;
    if !ack.paired {
        bail!("relay refused the pairing");
    }
    eprintln!("Paired with {}.", target);

    // Bytes the peer sent right after the ack may already sit in the buffer.
    let mut stdout = tokio::io::stdout();
    stdout.write_all(reader.buffer()).await?;
    stdout.flush().await?;

    let (mut sock_read, mut sock_write) = reader.into_inner().into_split();
    let mut stdin = tokio::io::stdin();

    tokio::select! {
        r = tokio::io::copy(&mut stdin, &mut sock_write) => { r?; }
        r = tokio::io::copy(&mut sock_read, &mut stdout) => { r?; }
    }
    stdout.flush().await?;
    Ok(())
}
