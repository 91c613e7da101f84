//! Game Session Management
//!
//! One live Senet game: the seated players, whose turn it is, the cast
//! score waiting to be spent, and the board itself. All rule questions
//! are delegated to [`crate::game::rules`]; this module owns turn order
//! and seat bookkeeping. Mutations are serialized by the registry's
//! per-session mutex.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::rng::DeterministicRng;
use crate::game::board::{Board, Colour};
use crate::game::rules::{self, Outcome, Target};
use crate::game::sticks::StickThrow;
use crate::network::protocol::ServerMessage;

/// How many players a game admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// One seat; the owner plays both colours.
    Single,
    /// Two seats, one per colour.
    Double,
}

impl PlayMode {
    /// Number of seats this mode admits.
    pub fn seat_limit(self) -> usize {
        match self {
            PlayMode::Single => 1,
            PlayMode::Double => 2,
        }
    }
}

/// A seated player: identity, transport connection and assigned colour.
#[derive(Debug)]
pub struct Seat {
    /// Signed-in username occupying the seat.
    pub identity: String,
    /// Transport-assigned connection identifier.
    pub conn: Uuid,
    /// Piece colour fixed when the seat was taken.
    pub colour: Colour,
    /// Message channel back to the connection.
    pub sender: mpsc::Sender<ServerMessage>,
}

/// What a throw did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrowReport {
    /// The cast itself.
    pub throw: StickThrow,
    /// True when the thrower had no legal move and the turn passed.
    pub forfeited: bool,
}

/// What an applied move did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// Rule outcome of the request.
    pub outcome: Outcome,
    /// Winner, when this move cleared the last piece.
    pub winner: Option<Colour>,
}

/// Session errors. Gating rejections; none of them mutate the game.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The connection does not hold a seat in this game.
    #[error("You are not seated in this game")]
    NotSeated,

    /// Both seats are taken.
    #[error("The game is full")]
    SeatsFull,

    /// The game has already been decided.
    #[error("The game is over")]
    GameOver,

    /// The opposing colour holds the turn.
    #[error("It is not your turn")]
    NotYourTurn,

    /// The sticks were already cast this turn.
    #[error("The sticks have already been thrown")]
    ScoreAlreadyCast,

    /// No score has been cast yet this turn.
    #[error("Throw the sticks first")]
    NoScoreCast,
}

/// A live Senet game.
#[derive(Debug)]
pub struct GameSession {
    /// Unique game name, the registry key.
    name: String,
    /// Password required to join, if any.
    password: Option<String>,
    /// Seat policy.
    mode: PlayMode,
    /// Username of the creator.
    owner: String,
    /// Seated players, in seating order.
    seats: Vec<Seat>,
    /// Colour handed to the first seat, decided by one coin flip at
    /// creation; the second seat takes the opposite.
    first_colour: Colour,
    /// Authoritative board.
    board: Board,
    /// Whose turn it is. Black opens.
    turn: Colour,
    /// The cast waiting to be spent, if any.
    score: Option<StickThrow>,
    /// Decided winner; set once, never cleared.
    winner: Option<Colour>,
    /// Session randomness: seat colours, stick casts, water re-casts.
    rng: DeterministicRng,
}

impl GameSession {
    /// Create a game with an empty standard board. Black opens; the
    /// first seat's colour comes off the creation coin flip.
    pub fn new(name: String, owner: String, mode: PlayMode, password: Option<String>) -> Self {
        Self::with_rng(name, owner, mode, password, DeterministicRng::from_entropy())
    }

    /// Create a game with explicit randomness, for replayable tests.
    pub fn with_rng(
        name: String,
        owner: String,
        mode: PlayMode,
        password: Option<String>,
        mut rng: DeterministicRng,
    ) -> Self {
        let first_colour = if rng.coin() {
            Colour::White
        } else {
            Colour::Black
        };
        Self {
            name,
            password,
            mode,
            owner,
            seats: Vec::with_capacity(2),
            first_colour,
            board: Board::standard(),
            turn: Colour::Black,
            score: None,
            winner: None,
            rng,
        }
    }

    /// Game name, the registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seat policy of the game.
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Username of the creator.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the supplied password (possibly absent) opens the game.
    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        match (&self.password, supplied) {
            (None, None) => true,
            (None, Some(s)) => s.is_empty(),
            (Some(expected), Some(s)) => expected == s,
            (Some(_), None) => false,
        }
    }

    /// Authoritative board state.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Colour holding the turn.
    pub fn turn(&self) -> Colour {
        self.turn
    }

    /// The cast waiting to be spent, if any.
    pub fn score(&self) -> Option<StickThrow> {
        self.score
    }

    /// Decided winner, if the game is over.
    pub fn winner(&self) -> Option<Colour> {
        self.winner
    }

    /// Number of seated players.
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Whether every seat the mode admits is taken.
    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.mode.seat_limit()
    }

    /// Whether the identity already holds a seat.
    pub fn is_seated(&self, identity: &str) -> bool {
        self.seats.iter().any(|s| s.identity == identity)
    }

    /// The seat held by a connection, if any.
    pub fn seat_for_conn(&self, conn: Uuid) -> Option<&Seat> {
        self.seats.iter().find(|s| s.conn == conn)
    }

    /// Seat a player. Policy (who may sit here) is the registry's
    /// business; this only assigns the colour and enforces capacity.
    pub fn seat(
        &mut self,
        identity: String,
        conn: Uuid,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Colour, SessionError> {
        if self.is_full() {
            return Err(SessionError::SeatsFull);
        }
        let colour = if self.seats.is_empty() {
            self.first_colour
        } else {
            self.first_colour.opposite()
        };
        self.seats.push(Seat {
            identity,
            conn,
            colour,
            sender,
        });
        Ok(colour)
    }

    /// Vacate the seat held by a connection, returning it if present.
    pub fn vacate(&mut self, conn: Uuid) -> Option<Seat> {
        let idx = self.seats.iter().position(|s| s.conn == conn)?;
        Some(self.seats.remove(idx))
    }

    /// Cast the sticks for the turn holder.
    ///
    /// When the cast leaves the turn colour with no legal move the turn
    /// is forfeit on the spot: it flips, the score clears, and the new
    /// holder casts at the start of their own turn.
    pub fn throw(&mut self, conn: Uuid) -> Result<ThrowReport, SessionError> {
        self.gate(conn)?;
        if self.score.is_some() {
            return Err(SessionError::ScoreAlreadyCast);
        }

        let throw = StickThrow::cast(&mut self.rng);
        if rules::has_any_legal_move(&self.board, self.turn, throw.score()) {
            self.score = Some(throw);
            Ok(ThrowReport {
                throw,
                forfeited: false,
            })
        } else {
            self.turn = self.turn.opposite();
            self.score = None;
            Ok(ThrowReport {
                throw,
                forfeited: true,
            })
        }
    }

    /// Apply a move request for the turn holder. `to` of `None` asks
    /// for the exit to Anubis.
    ///
    /// `Illegal` outcomes leave everything untouched and keep the turn;
    /// every other outcome spends the score, flips the turn and runs
    /// win detection.
    pub fn move_piece(
        &mut self,
        conn: Uuid,
        from: usize,
        to: Option<usize>,
    ) -> Result<MoveReport, SessionError> {
        self.gate(conn)?;
        let Some(score) = self.score else {
            return Err(SessionError::NoScoreCast);
        };

        let target = to.map(Target::House).unwrap_or(Target::Exit);
        let outcome = rules::apply_move(
            &mut self.board,
            self.turn,
            score.score(),
            from,
            target,
            &mut self.rng,
        );

        if outcome.consumes_turn() {
            self.score = None;
            self.winner = self.board.winner();
            if self.winner.is_none() {
                self.turn = self.turn.opposite();
            }
        }

        Ok(MoveReport {
            outcome,
            winner: self.winner,
        })
    }

    /// Common gating for gameplay intents: seated, game live and (in
    /// Double mode) holding the turn. In Single mode the lone player
    /// moves whichever colour holds the turn.
    fn gate(&self, conn: Uuid) -> Result<(), SessionError> {
        let seat = self.seat_for_conn(conn).ok_or(SessionError::NotSeated)?;
        if self.winner.is_some() {
            return Err(SessionError::GameOver);
        }
        if self.mode == PlayMode::Double && seat.colour != self.turn {
            return Err(SessionError::NotYourTurn);
        }
        Ok(())
    }

    /// Force a decided winner, for protocol tests that need a finished
    /// game without playing one out.
    #[cfg(test)]
    pub(crate) fn force_winner(&mut self, colour: Colour) {
        self.winner = Some(colour);
    }

    /// Send a message to every seated player.
    pub async fn broadcast(&self, message: ServerMessage) {
        for seat in &self.seats {
            let _ = seat.sender.send(message.clone()).await;
        }
    }
}
