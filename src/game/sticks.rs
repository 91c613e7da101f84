//! Stick Throws
//!
//! The Senet randomizer: five two-sided throwing sticks. The score is
//! the number of white faces, except that zero whites counts as 5.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;

/// Number of throwing sticks in a cast.
pub const STICK_COUNT: usize = 5;

/// One cast of the five sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickThrow {
    /// Face of each stick, `true` for white side up.
    coins: [bool; STICK_COUNT],
    /// Movement score derived from the faces.
    score: u8,
}

impl StickThrow {
    /// Cast all five sticks with fair independent flips.
    pub fn cast(rng: &mut DeterministicRng) -> Self {
        let mut coins = [false; STICK_COUNT];
        for face in coins.iter_mut() {
            *face = rng.coin();
        }
        Self::from_coins(coins)
    }

    /// Build a throw from explicit faces; scoring stays in one place.
    pub fn from_coins(coins: [bool; STICK_COUNT]) -> Self {
        let whites = coins.iter().filter(|f| **f).count() as u8;
        let score = if whites == 0 { 5 } else { whites };
        Self { coins, score }
    }

    /// The faces of the cast, white side up as `true`.
    pub fn coins(&self) -> [bool; STICK_COUNT] {
        self.coins
    }

    /// Movement score, always in `1..=5`.
    pub fn score(&self) -> u8 {
        self.score
    }
}
