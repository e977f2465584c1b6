//! rendezvous-ctl: command-line client for the rendezvous daemon.

mod cmd;

use anyhow::{Context, Result};

use cmd::directory::{cmd_notify, cmd_peers, cmd_poll, cmd_register};
use cmd::relay::cmd_relay;
use cmd::status::cmd_status;

const DEFAULT_SERVER: &str = "http://127.0.0.1:3000";
const DEFAULT_RELAY: &str = "127.0.0.1:4000";

fn print_usage() {
    println!("Usage: rendezvous-ctl [--server <url>] [--relay <host:port>] <command>");
    println!();
    println!("Commands:");
    println!("  status                                   Show table counts");
    println!("  register <id> <host> <port> [name] [key] Register or refresh a peer");
    println!("  peers <id>                               List peers other than <id>");
    println!("  poll <id>                                List peers and consume connect requests");
    println!("  notify <fromId> <toId>                   Ask <toId> to connect to <fromId>");
    println!("  relay <id> <target>                      Pipe stdin/stdout through the relay");
    println!();
    println!("Options:");
    println!("  --server <url>        Directory API (default: {})", DEFAULT_SERVER);
    println!("  --relay <host:port>   Relay address (default: {})", DEFAULT_RELAY);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut server = DEFAULT_SERVER.to_string();
    let mut relay = DEFAULT_RELAY.to_string();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--server" => {
                i += 1;
                server = args.get(i).context("--server requires a value")?.clone();
            }
            "--relay" => {
                i += 1;
                relay = args.get(i).context("--relay requires a value")?.clone();
            }
            other => remaining.push(other),
        }
        i += 1;
    }
    let server = server.trim_end_matches('/');

    match remaining.as_slice() {
        ["status"] | []                  => cmd_status(server).await,
        ["register", rest @ ..]          => cmd_register(server, rest).await,
        ["peers", id]                    => cmd_peers(server, id).await,
        ["poll", id]                     => cmd_poll(server, id).await,
        ["notify", from, to]             => cmd_notify(server, from, to).await,
        ["relay", id, target]            => cmd_relay(&relay, id, target).await,
        ["help"] | ["--help"] | ["-h"]   => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
