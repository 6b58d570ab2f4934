//! Bridge core: shares one live terminal-agent session with local peers.

pub mod adapter;
pub mod arbiter;
pub mod cli;
pub mod fanout;
pub mod host;
pub mod input;
pub mod mock;
pub mod registry;
pub mod router;
pub mod server;
pub mod telemetry;
mod transport;
