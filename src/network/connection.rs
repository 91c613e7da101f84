//! Connection Sessions
//!
//! One `ConnectionSession` per WebSocket: it verifies the claimed
//! connection id, walks the protocol state machine and dispatches
//! intents to the account store, the registry and the game session.
//! The client is never trusted; every request is re-checked here or
//! further down.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::board::Board;
use crate::game::rules::Outcome;
use crate::game::session::{GameSession, PlayMode};
use crate::network::accounts::AccountStore;
use crate::network::protocol::{
    home_coordinates, BoardSnapshot, ClientEnvelope, ClientIntent, ServerMessage, StatusEvent,
};
use crate::network::registry::GameRegistry;

/// Where a connection is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Fresh socket; only sign-in and create-account are allowed.
    Unauthenticated,
    /// An identity is bound; the client may fetch the game list.
    Authenticated,
    /// The game list has been served; create or join next.
    BrowsingGames,
    /// Seated, waiting for the setup push.
    InRoom,
    /// Gameplay intents flow.
    Playing,
    /// Terminal. Status pushes are suppressed from here on.
    GameOver,
}

/// Per-socket protocol driver.
pub struct ConnectionSession {
    /// Transport-assigned connection id; every envelope must claim it.
    id: Uuid,
    state: ProtocolState,
    /// Bound account name, once signed in.
    identity: Option<String>,
    /// The joined game, once seated.
    game: Option<Arc<Mutex<GameSession>>>,
    accounts: Arc<AccountStore>,
    registry: Arc<GameRegistry>,
    sender: mpsc::Sender<ServerMessage>,
}

impl ConnectionSession {
    /// Create the driver for a fresh socket.
    pub fn new(
        id: Uuid,
        accounts: Arc<AccountStore>,
        registry: Arc<GameRegistry>,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            state: ProtocolState::Unauthenticated,
            identity: None,
            game: None,
            accounts,
            registry,
            sender,
        }
    }

    /// Connection id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Bound account name, if signed in.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Handle one inbound envelope.
    pub async fn handle(&mut self, envelope: ClientEnvelope) {
        if envelope.sid != self.id {
            warn!(conn = %self.id, claimed = %envelope.sid, "sid mismatch");
            self.send_fatal("Connection Error", "Connection unrecognised")
                .await;
            return;
        }
        if !self.permits(&envelope.intent) {
            debug!(conn = %self.id, intent = envelope.intent.name(), state = ?self.state,
                   "intent rejected by state");
            self.send_fatal(
                "Unauthorised",
                format!("A {} request is not allowed right now", envelope.intent.name()),
            )
            .await;
            return;
        }

        match envelope.intent {
            ClientIntent::SignIn { username, password } => {
                self.sign_in(username, password).await;
            }
            ClientIntent::CreateAccount { username, password } => {
                self.create_account(username, password).await;
            }
            ClientIntent::GetGames => self.get_games().await,
            ClientIntent::CreateGame {
                name,
                single,
                password,
            } => self.create_game(name, single, password).await,
            ClientIntent::JoinGame { name, password } => self.join_game(name, password).await,
            ClientIntent::ThrowSticks => self.throw_sticks().await,
            ClientIntent::MovePiece {
                from_index,
                to_index,
            } => self.move_piece(from_index, to_index).await,
        }
    }

    /// Tear the connection down: vacate the seat, notify whoever is
    /// left, release the identity. The game itself stays registered so
    /// it can be rejoined; games only vanish at process teardown.
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.game.take() {
            let mut session = handle.lock().await;
            if let Some(seat) = session.vacate(self.id) {
                session
                    .broadcast(ServerMessage::Message {
                        text: format!("{} left the game", seat.identity),
                    })
                    .await;
                session
                    .broadcast(ServerMessage::BoardInfo {
                        data: snapshot(&session),
                    })
                    .await;
            }
        }
        if let Some(released) = self.accounts.release(self.id).await {
            info!(conn = %self.id, username = %released, "identity released");
        }
        self.identity = None;
    }

    /// Whether the current state permits the intent.
    fn permits(&self, intent: &ClientIntent) -> bool {
        use ClientIntent::*;
        matches!(
            (intent, self.state),
            (
                SignIn { .. } | CreateAccount { .. },
                ProtocolState::Unauthenticated
            ) | (GetGames, ProtocolState::Authenticated)
                | (
                    CreateGame { .. } | JoinGame { .. },
                    ProtocolState::BrowsingGames
                )
                | (
                    ThrowSticks | MovePiece { .. },
                    ProtocolState::Playing
                )
        )
    }

    async fn sign_in(&mut self, username: String, password: String) {
        if username.trim().is_empty() || password.is_empty() {
            self.send_fatal("Validation Error", "Username and password are required")
                .await;
            return;
        }
        match self.accounts.sign_in(&username, &password, self.id).await {
            Ok(()) => {
                info!(conn = %self.id, username = %username, "signed in");
                self.identity = Some(username.clone());
                self.state = ProtocolState::Authenticated;
                self.send_status(StatusEvent::LoggedIn { username }).await;
            }
            Err(err) => {
                debug!(conn = %self.id, username = %username, %err, "sign-in rejected");
                self.send_fatal("Sign In Error", err.to_string()).await;
            }
        }
    }

    async fn create_account(&mut self, username: String, password: String) {
        if username.trim().is_empty() || password.is_empty() {
            self.send_fatal("Validation Error", "Username and password are required")
                .await;
            return;
        }
        match self.accounts.create(&username, &password, self.id).await {
            Ok(()) => {
                info!(conn = %self.id, username = %username, "account created");
                self.identity = Some(username.clone());
                self.state = ProtocolState::Authenticated;
                self.send_status(StatusEvent::LoggedIn { username }).await;
            }
            Err(err) => {
                self.send_fatal("Account Error", err.to_string()).await;
            }
        }
    }

    async fn get_games(&mut self) {
        let identity = self.identity.clone().unwrap_or_default();
        let games = self.registry.list(&identity).await;
        self.state = ProtocolState::BrowsingGames;
        self.send_status(StatusEvent::GameList { games }).await;
    }

    async fn create_game(&mut self, name: String, single: bool, password: Option<String>) {
        if name.trim().is_empty() {
            self.send_fatal("Validation Error", "A game name is required")
                .await;
            return;
        }
        let identity = self.identity.clone().unwrap_or_default();
        let mode = if single {
            PlayMode::Single
        } else {
            PlayMode::Double
        };
        if let Err(err) = self
            .registry
            .create(&name, &identity, mode, password.clone())
            .await
        {
            self.send_fatal("Game Error", err.to_string()).await;
            return;
        }
        info!(conn = %self.id, game = %name, ?mode, "game created");
        // The creator takes the first seat straight away.
        self.join_game(name, password).await;
    }

    async fn join_game(&mut self, name: String, password: Option<String>) {
        if name.trim().is_empty() {
            self.send_fatal("Validation Error", "A game name is required")
                .await;
            return;
        }
        let identity = self.identity.clone().unwrap_or_default();
        let joined = self
            .registry
            .join(
                &name,
                &identity,
                password.as_deref(),
                self.id,
                self.sender.clone(),
            )
            .await;
        let (handle, colour) = match joined {
            Ok(seated) => seated,
            Err(err) => {
                debug!(conn = %self.id, game = %name, %err, "join rejected");
                self.send_fatal("Game Error", err.to_string()).await;
                return;
            }
        };

        info!(conn = %self.id, game = %name, ?colour, "seated");
        self.game = Some(Arc::clone(&handle));
        self.state = ProtocolState::InRoom;
        self.send_status(StatusEvent::JoinedGame { name: name.clone() })
            .await;

        let session = handle.lock().await;
        let your_colour = match session.mode() {
            PlayMode::Single => None,
            PlayMode::Double => Some(colour),
        };
        self.send_status(StatusEvent::BoardSetup {
            mode: session.mode(),
            labels: Board::labels().to_vec(),
            home_coordinates: home_coordinates(),
            name,
            your_colour,
        })
        .await;
        self.state = ProtocolState::Playing;

        session
            .broadcast(ServerMessage::BoardInfo {
                data: snapshot(&session),
            })
            .await;

        // A finished game reports its winner straight away.
        if let Some(winner) = session.winner() {
            self.send_status(StatusEvent::Winner { colour: winner }).await;
            self.state = ProtocolState::GameOver;
        }
    }

    async fn throw_sticks(&mut self) {
        let Some(handle) = self.game.clone() else {
            self.send_fatal("Game Error", "You are not in a game").await;
            return;
        };
        let mut guard = handle.lock().await;
        let session = &mut *guard;
        if self.enter_game_over_if_decided(session).await {
            return;
        }

        match session.throw(self.id) {
            Ok(report) => {
                debug!(conn = %self.id, score = report.throw.score(),
                       forfeited = report.forfeited, "sticks thrown");
                if report.forfeited {
                    session
                        .broadcast(ServerMessage::Message {
                            text: format!(
                                "A {} was thrown but no piece can move; the turn passes",
                                report.throw.score()
                            ),
                        })
                        .await;
                }
                session
                    .broadcast(ServerMessage::BoardInfo {
                        data: snapshot(session),
                    })
                    .await;
            }
            Err(err) => {
                self.send_fatal("Game Error", err.to_string()).await;
            }
        }
    }

    async fn move_piece(&mut self, from: usize, to: Option<usize>) {
        let Some(handle) = self.game.clone() else {
            self.send_fatal("Game Error", "You are not in a game").await;
            return;
        };
        let mut guard = handle.lock().await;
        let session = &mut *guard;
        if self.enter_game_over_if_decided(session).await {
            return;
        }

        let report = match session.move_piece(self.id, from, to) {
            Ok(report) => report,
            Err(err) => {
                self.send_fatal("Game Error", err.to_string()).await;
                return;
            }
        };

        match report.outcome {
            Outcome::Illegal(reason) => {
                debug!(conn = %self.id, ?reason, "move rejected");
                self.send_fatal("Illegal Move", reason.describe()).await;
                return;
            }
            Outcome::MovedIntoWater => {
                session
                    .broadcast(ServerMessage::Message {
                        text: "A piece went through the House of Water".to_string(),
                    })
                    .await;
            }
            Outcome::ForfeitNoLegalMove => {
                session
                    .broadcast(ServerMessage::Message {
                        text: "No piece can move; the turn passes".to_string(),
                    })
                    .await;
            }
            Outcome::Moved | Outcome::ExitedToAnubis => {}
        }

        session
            .broadcast(ServerMessage::BoardInfo {
                data: snapshot(session),
            })
            .await;

        if let Some(winner) = report.winner {
            info!(game = session.name(), ?winner, "game decided");
            session
                .broadcast(ServerMessage::Status(StatusEvent::Winner {
                    colour: winner,
                }))
                .await;
            self.state = ProtocolState::GameOver;
        }
    }

    /// Lazy game-over transition: a connection whose game has already
    /// been decided learns about it on its next gameplay intent.
    async fn enter_game_over_if_decided(&mut self, session: &GameSession) -> bool {
        let Some(winner) = session.winner() else {
            return false;
        };
        if self.state != ProtocolState::GameOver {
            self.send_status(StatusEvent::Winner { colour: winner }).await;
            self.state = ProtocolState::GameOver;
        }
        true
    }

    async fn send(&self, message: ServerMessage) {
        let _ = self.sender.send(message).await;
    }

    /// Status pushes stop once the connection reaches GameOver.
    async fn send_status(&self, event: StatusEvent) {
        if self.state != ProtocolState::GameOver {
            self.send(ServerMessage::Status(event)).await;
        }
    }

    async fn send_fatal(&self, title: &str, message: impl Into<String>) {
        self.send(ServerMessage::FatalError {
            title: title.to_string(),
            message: message.into(),
        })
        .await;
    }
}

/// Authoritative board snapshot for seated players.
fn snapshot(session: &GameSession) -> BoardSnapshot {
    BoardSnapshot {
        player_count: session.seat_count(),
        max: session.mode().seat_limit(),
        board: session.board().squares().to_vec(),
        positions: home_coordinates(),
        turn_colour: session.turn(),
        throw_result: session.score(),
        exited_counts: session.board().exited_counts(),
        movable_colour: session.winner().is_none().then(|| session.turn()),
    }
}
