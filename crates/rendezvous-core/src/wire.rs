//! Wire formats for the relay and signaling transports.
//!
//! Relay: the client's first line is a JSON declaration terminated by `\n`.
//! Once paired, the server writes one `{"paired":true}` line to each side and
//! the stream carries opaque bytes only.
//!
//! Signaling: every WebSocket frame is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

/// Line terminator for relay declarations and acknowledgements.
pub const LINE_TERMINATOR: u8 = b'\n';

// ── Relay ─────────────────────────────────────────────────────────────────────

/// First line sent by a relay client: "I am `id`, I want `token`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDeclaration {
    pub id: String,
    pub token: String,
}

impl RelayDeclaration {
    /// Key under which this connection waits.
    pub fn waiting_key(&self) -> (String, String) {
        (self.id.clone(), self.token.clone())
    }

    /// Key of the counterpart that would satisfy this declaration.
    pub fn complement_key(&self) -> (String, String) {
        (self.token.clone(), self.id.clone())
    }

    pub fn is_self_pairing(&self) -> bool {
        self.id == self.token
    }

    /// Serialize as a newline-terminated line, as a client sends it.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = serde_json::to_vec(self).unwrap_or_default();
        line.push(LINE_TERMINATOR);
        line
    }
}

/// Acknowledgement written to both sides once a pairing is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAck {
    pub paired: bool,
}

/// The exact bytes of the pairing acknowledgement line.
pub fn paired_line() -> &'static [u8] {
    b"{\"paired\":true}\n"
}

#[derive(Debug, thiserror::Error)]
pub enum DeclarationError {
    #[error("declaration exceeds {0} bytes without a line terminator")]
    TooLong(usize),
    #[error("connection closed before the declaration was complete")]
    Incomplete,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("declaration is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("declaration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("declaration field `{0}` is missing or empty")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawDeclaration {
    id: Option<String>,
    token: Option<String>,
}

/// Parse one declaration line (terminator excluded).
///
/// Surrounding whitespace is ignored; both fields must be present and non-empty.
pub fn parse_declaration(line: &[u8]) -> Result<RelayDeclaration, DeclarationError> {
    let text = std::str::from_utf8(line)?.trim();
    let raw: RawDeclaration = serde_json::from_str(text)?;
    let id = raw
        .id
        .filter(|s| !s.is_empty())
        .ok_or(DeclarationError::MissingField("id"))?;
    let token = raw
        .token
        .filter(|s| !s.is_empty())
        .ok_or(DeclarationError::MissingField("token"))?;
    Ok(RelayDeclaration { id, token })
}

// ── Signaling ─────────────────────────────────────────────────────────────────

/// Frames a signaling client sends to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Register {
        id: String,
    },
    Signal {
        target: String,
        #[serde(default)]
        signal: serde_json::Value,
    },
}

/// Frame the hub delivers to a signal's target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDelivery {
    /// Sender's registered id, `null` if the sender never registered.
    pub from: Option<String>,
    pub signal: serde_json::Value,
}
