//! CLI command modules.

pub mod directory;
pub mod http;
pub mod relay;
pub mod status;
