//! # Senet Server
//!
//! Server-authoritative implementation of Senet, the ancient Egyptian
//! board game, for two remote players over WebSocket. The client is
//! never trusted: board state, stick scores and move legality all live
//! here.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SENET SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  └── rng.rs        - Deterministic Xorshift128+ PRNG         │
//! │                                                              │
//! │  game/             - Game logic (deterministic)              │
//! │  ├── board.rs      - 30-house track, labels, displacement    │
//! │  ├── sticks.rs     - Five-stick throw randomizer             │
//! │  ├── rules.rs      - Move legality and application           │
//! │  └── session.rs    - Seats, turn order, live game state      │
//! │                                                              │
//! │  network/          - Networking (non-deterministic)          │
//! │  ├── server.rs     - WebSocket accept loop and presence      │
//! │  ├── protocol.rs   - Wire message types                      │
//! │  ├── accounts.rs   - Credential store and bindings           │
//! │  ├── registry.rs   - Live games, create/join policy          │
//! │  └── connection.rs - Per-socket protocol state machine       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` are deterministic: all randomness flows through
//! the seeded Xorshift128+ generator, so any game can be replayed in
//! tests from its seed. The network layer injects entropy-seeded
//! generators for live play.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use crate::game::board::{Board, Colour};
pub use crate::game::rules::{Outcome, Target};
pub use crate::game::session::{GameSession, PlayMode};
pub use crate::game::sticks::StickThrow;
pub use crate::network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
