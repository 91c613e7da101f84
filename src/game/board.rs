//! Board Model
//!
//! The 30-house Senet track: occupancy, the boustrophedon label
//! permutation, special-house semantics, and rebirth displacement.
//! Distances for move legality are always computed on labels, never on
//! raw storage indices.

use serde::{Deserialize, Serialize};

/// Number of houses on the track.
pub const HOUSE_COUNT: usize = 30;

/// Pieces each colour starts with.
pub const PIECES_PER_SIDE: u8 = 7;

/// House of Rebirth (label 15): displaced pieces walk down from here.
pub const HOUSE_REBIRTH: usize = 15;

/// House of Happiness (label 26): protected, cannot be captured onto.
pub const HOUSE_HAPPINESS: usize = 25;

/// House of Water (label 27): hazard, escaped only with a throw of 4.
pub const HOUSE_WATER: usize = 26;

/// House of Three Truths (label 28): exits to Anubis on exactly 3.
pub const HOUSE_THREE_TRUTHS: usize = 27;

/// House of Re-Atoum (label 29): exits to Anubis on exactly 2.
pub const HOUSE_RE_ATOUM: usize = 28;

/// House of Horus (label 30): exits to Anubis on exactly 1.
pub const HOUSE_HORUS: usize = 29;

/// Piece colour. Also identifies the two seats of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    /// White pieces.
    White,
    /// Black pieces.
    Black,
}

impl Colour {
    /// The opposing colour.
    pub fn opposite(self) -> Colour {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }

    /// Index into per-colour arrays such as the exited counts.
    pub fn index(self) -> usize {
        match self {
            Colour::White => 0,
            Colour::Black => 1,
        }
    }
}

/// Displayed number (1..=30) of the house at a storage index.
///
/// Labels run boustrophedon across three rows of ten: row 0 left to right
/// (1-10), row 1 right to left (11-20), row 2 left to right (21-30).
pub fn label(index: usize) -> u8 {
    debug_assert!(index < HOUSE_COUNT);
    match index {
        0..=9 => index as u8 + 1,
        10..=19 => 30 - index as u8,
        _ => index as u8 + 1,
    }
}

/// Storage index of the house with a displayed number (1..=30).
pub fn index_of_label(lbl: u8) -> usize {
    debug_assert!((1..=30).contains(&lbl));
    match lbl {
        1..=10 => lbl as usize - 1,
        11..=20 => 30 - lbl as usize,
        _ => lbl as usize - 1,
    }
}

/// The stick score that lets a piece leave a house for Anubis, if any.
pub fn exit_score(index: usize) -> Option<u8> {
    match index {
        HOUSE_HAPPINESS => Some(5),
        HOUSE_WATER => Some(4),
        HOUSE_THREE_TRUTHS => Some(3),
        HOUSE_RE_ATOUM => Some(2),
        HOUSE_HORUS => Some(1),
        _ => None,
    }
}

/// Board state: house occupancy plus the per-colour exited counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Occupancy by storage index. At most one piece per house.
    squares: [Option<Colour>; HOUSE_COUNT],
    /// Pieces that have reached Anubis, indexed by [`Colour::index`].
    exited: [u8; 2],
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

impl Board {
    /// The standard opening position: both colours' pieces alternating
    /// from the start square, white on even indices.
    pub fn standard() -> Self {
        let mut squares = [None; HOUSE_COUNT];
        for (i, square) in squares
            .iter_mut()
            .take(2 * PIECES_PER_SIDE as usize)
            .enumerate()
        {
            *square = Some(if i % 2 == 0 {
                Colour::White
            } else {
                Colour::Black
            });
        }
        Self {
            squares,
            exited: [0, 0],
        }
    }

    /// Build a board from explicit occupancy, for scenario setup.
    pub fn from_squares(squares: [Option<Colour>; HOUSE_COUNT], exited: [u8; 2]) -> Self {
        Self { squares, exited }
    }

    /// The piece on a house, if any.
    pub fn piece_at(&self, index: usize) -> Option<Colour> {
        self.squares.get(index).copied().flatten()
    }

    /// Raw occupancy in storage order.
    pub fn squares(&self) -> &[Option<Colour>; HOUSE_COUNT] {
        &self.squares
    }

    /// Pieces of a colour still on the track.
    pub fn pieces_on_board(&self, colour: Colour) -> u8 {
        self.squares.iter().flatten().filter(|c| **c == colour).count() as u8
    }

    /// Pieces of a colour that have reached Anubis.
    pub fn exited(&self, colour: Colour) -> u8 {
        self.exited[colour.index()]
    }

    /// Exited counts as `[white, black]`, the order the wire uses.
    pub fn exited_counts(&self) -> [u8; 2] {
        self.exited
    }

    /// Exited plus on-board pieces, both colours. Constant for the
    /// lifetime of a game (14 for the standard setup).
    pub fn piece_total(&self) -> u8 {
        self.exited[0] + self.exited[1] + self.squares.iter().flatten().count() as u8
    }

    /// Take the piece off a house. Caller has verified occupancy.
    pub(crate) fn lift(&mut self, index: usize) -> Option<Colour> {
        self.squares[index].take()
    }

    /// Put a piece on an empty house.
    pub(crate) fn put(&mut self, index: usize, colour: Colour) {
        debug_assert!(self.squares[index].is_none());
        self.squares[index] = Some(colour);
    }

    /// Remove a piece from play and count it at Anubis.
    pub(crate) fn send_to_anubis(&mut self, index: usize) {
        if let Some(colour) = self.squares[index].take() {
            self.exited[colour.index()] += 1;
        }
    }

    /// Displace a piece toward the House of Rebirth: walk from label 15
    /// downward to the first empty house. The walk terminates because at
    /// most 14 pieces ever occupy 30 houses; the upward fallback is
    /// unreachable but keeps the function total.
    pub(crate) fn place_toward_rebirth(&mut self, colour: Colour) {
        for lbl in (1..=label(HOUSE_REBIRTH)).rev() {
            let idx = index_of_label(lbl);
            if self.squares[idx].is_none() {
                self.squares[idx] = Some(colour);
                return;
            }
        }
        for lbl in (label(HOUSE_REBIRTH) + 1)..=30 {
            let idx = index_of_label(lbl);
            if self.squares[idx].is_none() {
                self.squares[idx] = Some(colour);
                return;
            }
        }
    }

    /// The colour that has cleared all its pieces off the track, if any.
    /// The side that clears first wins.
    pub fn winner(&self) -> Option<Colour> {
        for colour in [Colour::White, Colour::Black] {
            if self.exited(colour) > 0 && self.pieces_on_board(colour) == 0 {
                return Some(colour);
            }
        }
        None
    }

    /// Labels in storage order, for the board-setup payload.
    pub fn labels() -> [u8; HOUSE_COUNT] {
        let mut labels = [0u8; HOUSE_COUNT];
        for (i, lbl) in labels.iter_mut().enumerate() {
            *lbl = label(i);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_labels_are_boustrophedon() {
        assert_eq!(label(0), 1);
        assert_eq!(label(9), 10);
        assert_eq!(label(10), 20);
        assert_eq!(label(19), 11);
        assert_eq!(label(20), 21);
        assert_eq!(label(29), 30);
    }

    #[test]
    fn test_label_index_inverse() {
        for i in 0..HOUSE_COUNT {
            assert_eq!(index_of_label(label(i)), i);
        }
    }

    #[test]
    fn test_special_house_labels() {
        assert_eq!(label(HOUSE_REBIRTH), 15);
        assert_eq!(label(HOUSE_HAPPINESS), 26);
        assert_eq!(label(HOUSE_WATER), 27);
        assert_eq!(label(HOUSE_HORUS), 30);
    }

    #[test]
    fn test_standard_setup() {
        let board = Board::standard();
        assert_eq!(board.pieces_on_board(Colour::White), PIECES_PER_SIDE);
        assert_eq!(board.pieces_on_board(Colour::Black), PIECES_PER_SIDE);
        assert_eq!(board.piece_total(), 2 * PIECES_PER_SIDE);
        assert_eq!(board.piece_at(0), Some(Colour::White));
        assert_eq!(board.piece_at(1), Some(Colour::Black));
        assert_eq!(board.piece_at(14), None);
    }

    #[test]
    fn test_exit_scores() {
        assert_eq!(exit_score(HOUSE_HAPPINESS), Some(5));
        assert_eq!(exit_score(HOUSE_WATER), Some(4));
        assert_eq!(exit_score(HOUSE_THREE_TRUTHS), Some(3));
        assert_eq!(exit_score(HOUSE_RE_ATOUM), Some(2));
        assert_eq!(exit_score(HOUSE_HORUS), Some(1));
        assert_eq!(exit_score(0), None);
        assert_eq!(exit_score(HOUSE_REBIRTH), None);
    }

    #[test]
    fn test_rebirth_displacement_prefers_label_15() {
        let mut board = Board::from_squares([None; HOUSE_COUNT], [0, 0]);
        board.place_toward_rebirth(Colour::White);
        assert_eq!(board.piece_at(HOUSE_REBIRTH), Some(Colour::White));
    }

    #[test]
    fn test_rebirth_displacement_walks_down() {
        let mut squares = [None; HOUSE_COUNT];
        squares[HOUSE_REBIRTH] = Some(Colour::Black); // label 15
        squares[index_of_label(14)] = Some(Colour::Black);
        let mut board = Board::from_squares(squares, [0, 0]);

        board.place_toward_rebirth(Colour::White);
        assert_eq!(board.piece_at(index_of_label(13)), Some(Colour::White));
    }

    #[test]
    fn test_send_to_anubis_counts() {
        let mut board = Board::standard();
        board.send_to_anubis(0);
        assert_eq!(board.exited(Colour::White), 1);
        assert_eq!(board.pieces_on_board(Colour::White), PIECES_PER_SIDE - 1);
        assert_eq!(board.piece_total(), 2 * PIECES_PER_SIDE);
    }

    #[test]
    fn test_winner_requires_cleared_side() {
        let mut board = Board::standard();
        assert_eq!(board.winner(), None);

        for i in 0..HOUSE_COUNT {
            if board.piece_at(i) == Some(Colour::Black) {
                board.send_to_anubis(i);
            }
        }
        assert_eq!(board.winner(), Some(Colour::Black));
    }

    proptest! {
        #[test]
        fn prop_label_permutation_is_bijective(i in 0usize..HOUSE_COUNT, j in 0usize..HOUSE_COUNT) {
            prop_assert!((1..=30).contains(&label(i)));
            if i != j {
                prop_assert_ne!(label(i), label(j));
            }
        }

        #[test]
        fn prop_displacement_preserves_piece_total(occupied in proptest::collection::btree_set(0usize..HOUSE_COUNT, 0..13)) {
            let mut squares = [None; HOUSE_COUNT];
            for idx in &occupied {
                squares[*idx] = Some(Colour::Black);
            }
            let mut board = Board::from_squares(squares, [0, 0]);
            let before = board.piece_total();

            board.place_toward_rebirth(Colour::White);
            prop_assert_eq!(board.piece_total(), before + 1);
        }
    }
}
