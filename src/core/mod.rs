//! Deterministic Primitives
//!
//! Shared building blocks with no dependency on the network layer.

pub mod rng;

pub use rng::DeterministicRng;
