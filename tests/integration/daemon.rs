use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::*;

/// A spawned daemon, killed on drop.
struct Daemon {
    child: Child,
    http_port: u16,
    relay_port: u16,
    config_dir: PathBuf,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
        std::fs::remove_dir_all(&self.config_dir).ok();
    }
}

/// Spawn `rendezvousd <http> <relay> <signaling>` with a throwaway config file.
/// Returns `None` when the binary has not been built.
fn spawn_daemon(name: &str, extra_env: &[(&str, &str)]) -> Option<Daemon> {
    let Some(binary) = daemon_binary() else {
        eprintln!("SKIP: rendezvousd not built, run cargo build -p rendezvousd first");
        return None;
    };

    let config_dir = std::env::temp_dir().join(format!(
        "rendezvous-it-{}-{}",
        name,
        std::process::id()
    ));
    std::fs::create_dir_all(&config_dir).unwrap();

    let (http_port, relay_port, signaling_port) = (free_port(), free_port(), free_port());
    let child = Command::new(binary)
        .args([
            http_port.to_string(),
            relay_port.to_string(),
            signaling_port.to_string(),
        ])
        .env("RENDEZVOUS_CONFIG", config_dir.join("config.toml"))
        .env("RENDEZVOUS_NETWORK__BIND_ADDR", "127.0.0.1")
        .envs(extra_env.iter().copied())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn rendezvousd");

    Some(Daemon {
        child,
        http_port,
        relay_port,
        config_dir,
    })
}

async fn declare(relay_port: u16, id: &str, token: &str) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(loopback(relay_port)).await.unwrap();
    stream
        .write_all(format!("{{\"id\":\"{id}\",\"token\":\"{token}\"}}\n").as_bytes())
        .await
        .unwrap();
    BufReader::new(stream)
}

async fn read_ack(conn: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(5), conn.read_line(&mut line))
        .await
        .expect("timed out waiting for ack")
        .unwrap();
    line
}

/// Two peers declare complementary pairs and end up spliced together.
#[tokio::test]
async fn test_daemon_relay_pairs_complementary_declarations() {
    let Some(daemon) = spawn_daemon("relay", &[]) else {
        return;
    };
    wait_for_api(&format!("http://127.0.0.1:{}", daemon.http_port), 50)
        .await
        .unwrap();

    let mut a = declare(daemon.relay_port, "A", "B").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut b = declare(daemon.relay_port, "B", "A").await;

    assert_eq!(read_ack(&mut a).await, "{\"paired\":true}\n");
    assert_eq!(read_ack(&mut b).await, "{\"paired\":true}\n");

    a.get_mut().write_all(b"hello from A").await.unwrap();
    let mut buf = [0u8; 12];
    b.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello from A");

    b.get_mut().write_all(b"hi").await.unwrap();
    let mut buf = [0u8; 2];
    a.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hi");

    // Closing one side closes the other.
    drop(a);
    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), b.read_to_end(&mut rest))
        .await
        .expect("B was not closed")
        .unwrap();
    assert_eq!(n, 0);
}

/// The directory and the relay run side by side in one process.
#[tokio::test]
async fn test_daemon_status_counts_waiting_relay() {
    let Some(daemon) = spawn_daemon("status", &[]) else {
        return;
    };
    let base = format!("http://127.0.0.1:{}", daemon.http_port);
    wait_for_api(&base, 50).await.unwrap();

    let (status, _) = api_post(
        &base,
        "/register",
        serde_json::json!({"id": "A", "host": "127.0.0.1", "port": 5000}),
    )
    .await
    .unwrap();
    assert_eq!(status, 200);

    let _waiting = declare(daemon.relay_port, "A", "B").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = api_get(&base, "/status").await.unwrap();
    assert_eq!(status["peers"], 1);
    assert_eq!(status["awaitingRelays"], 1);
}

/// With self-pairing rejected, an (X, X) declaration is closed without an ack.
#[tokio::test]
async fn test_daemon_rejects_self_pairing_when_configured() {
    let Some(daemon) = spawn_daemon("selfpair", &[("RENDEZVOUS_RELAY__REJECT_SELF_PAIRING", "true")])
    else {
        return;
    };
    wait_for_api(&format!("http://127.0.0.1:{}", daemon.http_port), 50)
        .await
        .unwrap();

    let mut conn = declare(daemon.relay_port, "X", "X").await;
    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), conn.read_to_end(&mut rest))
        .await
        .expect("self-pairing connection was not closed")
        .unwrap_or(0);
    assert_eq!(n, 0);
}
