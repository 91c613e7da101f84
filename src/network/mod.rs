//! Networking Layer
//!
//! The non-deterministic edge of the crate: WebSocket transport, wire
//! messages, accounts, the game registry and the per-connection
//! protocol state machine.

pub mod accounts;
pub mod connection;
pub mod protocol;
pub mod registry;
pub mod server;

pub use accounts::AccountStore;
pub use connection::{ConnectionSession, ProtocolState};
pub use protocol::{ClientEnvelope, ClientIntent, ServerMessage, StatusEvent};
pub use registry::GameRegistry;
pub use server::{GameServer, ServerConfig};
