//! rendezvous-services: the in-memory tables shared by every listener.

pub mod awaiting;
pub mod directory;
pub mod notify;
pub mod signaling;

pub use awaiting::{AwaitingTable, ConnId, PairKey, RelayHandoff, Rendezvous, Waiting};
pub use directory::{PeerDirectory, PeerRecord};
pub use notify::NotifyBoard;
pub use signaling::{Delivery, SignalingSession, SignalingSessions};
