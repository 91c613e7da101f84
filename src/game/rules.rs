//! Move Rules
//!
//! Legality and application of Senet moves: label distances, the House of
//! Happiness pass/landing restrictions, the water hazard, exact-exit
//! houses, block protection, the backward fallback, forfeit detection and
//! win detection. Everything here is deterministic given the injected RNG
//! (used only for the water escape re-cast).

use crate::core::rng::DeterministicRng;
use crate::game::board::{
    exit_score, index_of_label, label, Board, Colour, HOUSE_COUNT, HOUSE_HAPPINESS, HOUSE_HORUS,
    HOUSE_RE_ATOUM, HOUSE_THREE_TRUTHS, HOUSE_WATER,
};
use crate::game::sticks::StickThrow;

/// Label of the House of Happiness; a forward move may not pass it.
const HAPPINESS_LABEL: u8 = 26;

/// The water hazard is escaped only with a re-cast of exactly 4.
const WATER_ESCAPE_SCORE: u8 = 4;

/// Destination of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A house on the track, by storage index.
    House(usize),
    /// The off-board Anubis target.
    Exit,
}

/// Why a move request was rejected. The turn is never consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    /// The origin house does not hold a piece of the moving colour.
    WrongPiece,
    /// A forward move may not pass the House of Happiness without
    /// landing exactly on it.
    MustLandOnHappiness,
    /// The House of Happiness can never be captured onto.
    HappinessProtected,
    /// An exact-exit house only releases its piece on the matching throw.
    WrongExitScore,
    /// The label distance does not match the thrown score.
    WrongDistance,
    /// The destination holds the mover's own piece.
    OwnPieceBlocking,
    /// The destination piece is flanked by opposing pieces on both
    /// label-adjacent houses.
    BlockProtected,
    /// The forward candidate is blocked; the piece must retract instead.
    BackwardMoveRequired,
    /// A backward move was requested while the forward move is legal.
    ForwardMoveAvailable,
}

impl IllegalReason {
    /// Human-readable rejection text for the fatal-error payload.
    pub fn describe(self) -> &'static str {
        match self {
            IllegalReason::WrongPiece => "No piece of yours on that house",
            IllegalReason::MustLandOnHappiness => {
                "Cannot pass the House of Happiness without landing on it"
            }
            IllegalReason::HappinessProtected => "The House of Happiness cannot be captured",
            IllegalReason::WrongExitScore => "That house only releases on its exact throw",
            IllegalReason::WrongDistance => "Distance does not match the thrown score",
            IllegalReason::OwnPieceBlocking => "Your own piece occupies that house",
            IllegalReason::BlockProtected => "That piece is protected by its neighbours",
            IllegalReason::BackwardMoveRequired => "Forward is blocked; you must move backward",
            IllegalReason::ForwardMoveAvailable => "The forward move is open and must be taken",
        }
    }
}

/// Semantic result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The piece moved (possibly capturing).
    Moved,
    /// The piece ended in the water hazard or was dropped into the
    /// rebirth lane by it.
    MovedIntoWater,
    /// The piece left the board for Anubis.
    ExitedToAnubis,
    /// No piece of the mover had any legal move; the turn is consumed
    /// with the board unchanged.
    ForfeitNoLegalMove,
    /// The request was rejected; nothing changed.
    Illegal(IllegalReason),
}

impl Outcome {
    /// Whether this outcome ends the mover's turn.
    pub fn consumes_turn(self) -> bool {
        !matches!(self, Outcome::Illegal(_))
    }
}

/// Validate and apply a move of `mover` from `from` toward `to` with the
/// thrown `score`, mutating the board only when the move is accepted.
///
/// Checks run in the fixed precedence order of the rules; the first
/// failing check decides the rejection reason.
pub fn apply_move(
    board: &mut Board,
    mover: Colour,
    score: u8,
    from: usize,
    to: Target,
    rng: &mut DeterministicRng,
) -> Outcome {
    if board.piece_at(from) != Some(mover) {
        return Outcome::Illegal(IllegalReason::WrongPiece);
    }

    // The water hazard resolves on any attempt to act from it: re-cast
    // the sticks, escape to Anubis on exactly 4, sink to rebirth else.
    // Destination protection is still checked first; a rejected request
    // leaves the piece sitting in the water.
    if from == HOUSE_WATER {
        if let Target::House(to_index) = to {
            if to_index == HOUSE_HAPPINESS && board.piece_at(to_index).is_some_and(|c| c != mover)
            {
                return Outcome::Illegal(IllegalReason::HappinessProtected);
            }
        }
        let recast = StickThrow::cast(rng);
        if recast.score() == WATER_ESCAPE_SCORE {
            board.send_to_anubis(from);
            return Outcome::ExitedToAnubis;
        }
        board.lift(from);
        board.place_toward_rebirth(mover);
        return Outcome::MovedIntoWater;
    }

    match to {
        Target::Exit => match exit_score(from) {
            Some(required) if required == score => {
                board.send_to_anubis(from);
                Outcome::ExitedToAnubis
            }
            _ => Outcome::Illegal(IllegalReason::WrongExitScore),
        },
        Target::House(to_index) => apply_house_move(board, mover, score, from, to_index, rng),
    }
}

fn apply_house_move(
    board: &mut Board,
    mover: Colour,
    score: u8,
    from: usize,
    to: usize,
    _rng: &mut DeterministicRng,
) -> Outcome {
    if to >= HOUSE_COUNT || to == from {
        return Outcome::Illegal(IllegalReason::WrongDistance);
    }

    let from_label = label(from);
    let to_label = label(to);

    if from_label < HAPPINESS_LABEL && to_label > HAPPINESS_LABEL {
        return Outcome::Illegal(IllegalReason::MustLandOnHappiness);
    }
    if to == HOUSE_HAPPINESS && board.piece_at(to).is_some_and(|c| c != mover) {
        return Outcome::Illegal(IllegalReason::HappinessProtected);
    }

    // Exact-exit houses hold their piece for the matching throw; any
    // other throw only permits the retreat, which drops the piece into
    // the rebirth lane.
    if is_exact_exit(from) {
        let required = exit_score(from).unwrap_or(0);
        if score != required && to_label + score == from_label {
            board.lift(from);
            board.place_toward_rebirth(mover);
            return Outcome::MovedIntoWater;
        }
        return Outcome::Illegal(IllegalReason::WrongExitScore);
    }

    let dist = i16::from(to_label) - i16::from(from_label);
    if dist == i16::from(score) {
        match landing(board, mover, to) {
            Ok(()) => apply_landing(board, mover, from, to),
            Err(reason) => {
                if backward_move_legal(board, mover, from, score) {
                    Outcome::Illegal(IllegalReason::BackwardMoveRequired)
                } else if has_any_legal_move(board, mover, score) {
                    Outcome::Illegal(reason)
                } else {
                    Outcome::ForfeitNoLegalMove
                }
            }
        }
    } else if dist == -i16::from(score) {
        if forward_move_legal(board, mover, from, score) {
            return Outcome::Illegal(IllegalReason::ForwardMoveAvailable);
        }
        match landing(board, mover, to) {
            Ok(()) => apply_landing(board, mover, from, to),
            Err(reason) => {
                if has_any_legal_move(board, mover, score) {
                    Outcome::Illegal(reason)
                } else {
                    Outcome::ForfeitNoLegalMove
                }
            }
        }
    } else {
        Outcome::Illegal(IllegalReason::WrongDistance)
    }
}

/// Occupy the target, displacing any captured piece. Targets have been
/// validated by [`landing`].
fn apply_landing(board: &mut Board, mover: Colour, from: usize, to: usize) -> Outcome {
    if let Some(victim) = board.lift(to) {
        board.lift(from);
        board.put(to, mover);
        if is_exact_exit(to) {
            // A capture on the exact-exit houses sends the victim to the
            // rebirth lane instead of the mover's origin.
            board.place_toward_rebirth(victim);
        } else {
            board.put(from, victim);
        }
    } else {
        board.lift(from);
        board.put(to, mover);
    }

    if to == HOUSE_WATER {
        Outcome::MovedIntoWater
    } else {
        Outcome::Moved
    }
}

/// Whether a house can be landed on by `mover`.
fn landing(board: &Board, mover: Colour, to: usize) -> Result<(), IllegalReason> {
    let occupant = match board.piece_at(to) {
        None => return Ok(()),
        Some(c) => c,
    };
    if occupant == mover {
        return Err(IllegalReason::OwnPieceBlocking);
    }
    if to == HOUSE_HAPPINESS {
        return Err(IllegalReason::HappinessProtected);
    }
    if is_exact_exit(to) {
        // The exact-exit houses are never protected.
        return Ok(());
    }

    // Symmetric both-neighbour protection; labels 1 and 30 have a single
    // neighbour and are never protected.
    let to_label = label(to);
    if to_label > 1 && to_label < 30 {
        let below = board.piece_at(index_of_label(to_label - 1));
        let above = board.piece_at(index_of_label(to_label + 1));
        if below == Some(occupant) && above == Some(occupant) {
            return Err(IllegalReason::BlockProtected);
        }
    }
    Ok(())
}

fn is_exact_exit(index: usize) -> bool {
    matches!(index, HOUSE_THREE_TRUTHS | HOUSE_RE_ATOUM | HOUSE_HORUS)
}

/// Whether the piece at `from` has a legal forward action (move or exit)
/// with the thrown score.
fn forward_move_legal(board: &Board, mover: Colour, from: usize, score: u8) -> bool {
    if from == HOUSE_WATER {
        // The hazard always resolves: escape or sink.
        return true;
    }
    if is_exact_exit(from) {
        return exit_score(from) == Some(score);
    }
    if from == HOUSE_HAPPINESS && score == 5 {
        // Lane continuation: exits straight to Anubis.
        return true;
    }

    let from_label = label(from);
    let to_label = from_label + score;
    if to_label > 30 {
        return false;
    }
    if from_label < HAPPINESS_LABEL && to_label > HAPPINESS_LABEL {
        return false;
    }
    landing(board, mover, index_of_label(to_label)).is_ok()
}

/// Whether the piece at `from` has a legal backward retraction with the
/// thrown score.
fn backward_move_legal(board: &Board, mover: Colour, from: usize, score: u8) -> bool {
    if from == HOUSE_WATER {
        return false;
    }
    if is_exact_exit(from) {
        // Retreat into the rebirth lane, available whenever the exact
        // throw was missed.
        return exit_score(from) != Some(score);
    }
    let from_label = label(from);
    if from_label <= score {
        return false;
    }
    landing(board, mover, index_of_label(from_label - score)).is_ok()
}

/// Whether any piece of `mover` can act with the thrown score. When this
/// is false the turn is forfeit.
pub fn has_any_legal_move(board: &Board, mover: Colour, score: u8) -> bool {
    (0..HOUSE_COUNT).any(|i| {
        board.piece_at(i) == Some(mover)
            && (forward_move_legal(board, mover, i, score)
                || backward_move_legal(board, mover, i, score))
    })
}
