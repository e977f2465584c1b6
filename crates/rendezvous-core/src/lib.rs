//! rendezvous-core: wire and JSON body types plus daemon configuration.
//! All other rendezvous crates depend on this one.

pub mod config;
pub mod directory;
pub mod wire;

pub use directory::{NotifyRequest, PeerView, RegisterRequest, ValidationError};
pub use wire::{ClientFrame, DeclarationError, RelayDeclaration, SignalDelivery};
