//! Senet Game Logic
//!
//! Deterministic game state and rules: the board, the stick randomizer,
//! move legality and live session bookkeeping. Nothing in here touches a
//! socket; the network layer drives these types through the registry.

pub mod board;
pub mod rules;
pub mod session;
pub mod sticks;

pub use board::{Board, Colour};
pub use rules::{Outcome, Target};
pub use session::{GameSession, PlayMode};
pub use sticks::StickThrow;
