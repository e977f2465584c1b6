//! Configuration system for the rendezvous daemon.
//!
//! Resolution order: command-line ports → environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RENDEZVOUS_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/rendezvous/config.toml
//!   3. ~/.config/rendezvous/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub network: NetworkConfig,
    pub directory: DirectoryConfig,
    pub relay: RelayConfig,
    pub signaling: SignalingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address all three listeners bind to.
    pub bind_addr: String,
    /// Directory HTTP surface.
    pub http_port: u16,
    /// Raw TCP relay.
    pub relay_port: u16,
    /// Signaling WebSocket hub.
    pub signaling_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Records idle longer than this are pruned on the next read.
    pub stale_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Close unmatched waiting connections after N seconds. 0 = wait forever.
    pub await_timeout_secs: u64,
    /// Close connections that declare `id == token` instead of letting them wait.
    pub reject_self_pairing: bool,
    /// Longest accepted declaration line, terminator excluded.
    pub max_declaration_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub enabled: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            http_port: 3000,
            relay_port: 4000,
            signaling_port: 4001,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 300, // 5 minutes
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            await_timeout_secs: 0,
            reject_self_pairing: false,
            max_declaration_bytes: 4096,
        }
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl DirectoryConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

impl RelayConfig {
    /// `None` when waiting connections never time out.
    pub fn await_timeout(&self) -> Option<Duration> {
        (self.await_timeout_secs > 0).then(|| Duration::from_secs(self.await_timeout_secs))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("rendezvous")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid port argument {0:?}")]
    InvalidPort(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RendezvousConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RendezvousConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RENDEZVOUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RendezvousConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply positional `[httpPort] [relayPort] [signalingPort]` arguments.
    pub fn apply_port_args<S: AsRef<str>>(&mut self, args: &[S]) -> Result<(), ConfigError> {
        let slots = [
            &mut self.network.http_port,
            &mut self.network.relay_port,
            &mut self.network.signaling_port,
        ];
        for (slot, arg) in slots.into_iter().zip(args) {
            let arg = arg.as_ref();
            *slot = arg
                .parse()
                .map_err(|_| ConfigError::InvalidPort(arg.to_string()))?;
        }
        Ok(())
    }

    /// Apply RENDEZVOUS_* overrides, looking each key up through `var`.
    pub fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |v: String| v == "true" || v == "1";

        if let Some(v) = var("RENDEZVOUS_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Some(p) = var("RENDEZVOUS_NETWORK__HTTP_PORT").and_then(|v| v.parse().ok()) {
            self.network.http_port = p;
        }
        if let Some(p) = var("RENDEZVOUS_NETWORK__RELAY_PORT").and_then(|v| v.parse().ok()) {
            self.network.relay_port = p;
        }
        if let Some(p) = var("RENDEZVOUS_NETWORK__SIGNALING_PORT").and_then(|v| v.parse().ok()) {
            self.network.signaling_port = p;
        }
        if let Some(s) = var("RENDEZVOUS_DIRECTORY__STALE_AFTER_SECS").and_then(|v| v.parse().ok())
        {
            self.directory.stale_after_secs = s;
        }
        if let Some(s) = var("RENDEZVOUS_RELAY__AWAIT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.relay.await_timeout_secs = s;
        }
        if let Some(n) = var("RENDEZVOUS_RELAY__MAX_DECLARATION_BYTES").and_then(|v| v.parse().ok())
        {
            self.relay.max_declaration_bytes = n;
        }
        if let Some(v) = var("RENDEZVOUS_RELAY__REJECT_SELF_PAIRING") {
            self.relay.reject_self_pairing = flag(v);
        }
        if let Some(v) = var("RENDEZVOUS_SIGNALING__ENABLED") {
            self.signaling.enabled = flag(v);
        }
    }
}
