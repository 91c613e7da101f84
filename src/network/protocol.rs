//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. All
//! messages are JSON: inbound traffic is a flat envelope tagged by
//! `event`, outbound traffic is tagged by `type`. Both directions are
//! closed unions; anything that fails to parse is rejected at the edge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::board::{Colour, HOUSE_COUNT};
use crate::game::session::PlayMode;
use crate::game::sticks::StickThrow;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Inbound envelope: the claimed connection id plus the intent fields,
/// flattened so the wire shape is `{sid, event, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Connection id the client claims; must match the transport's.
    pub sid: Uuid,
    /// The intent itself.
    #[serde(flatten)]
    pub intent: ClientIntent,
}

/// Everything a client can ask for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientIntent {
    /// Bind an existing account to this connection.
    SignIn {
        /// Account name.
        username: String,
        /// Plaintext password; digested server-side, never stored.
        password: String,
    },

    /// Register a fresh account and sign in as it.
    CreateAccount {
        /// Requested account name.
        username: String,
        /// Password for the new account.
        password: String,
    },

    /// Ask for the joinable game list.
    GetGames,

    /// Create a game and take its first seat.
    CreateGame {
        /// Unique game name.
        name: String,
        /// True for a one-seat game the owner plays alone.
        single: bool,
        /// Password future joiners must supply.
        #[serde(default)]
        password: Option<String>,
    },

    /// Take a seat in an existing game.
    JoinGame {
        /// Name of the game to join.
        name: String,
        /// Password, when the game has one.
        #[serde(default)]
        password: Option<String>,
    },

    /// Cast the sticks for the current turn.
    ThrowSticks,

    /// Move a piece with the cast score.
    #[serde(rename_all = "camelCase")]
    MovePiece {
        /// Storage index of the piece to move.
        from_index: usize,
        /// Destination storage index; absent asks for the exit to
        /// Anubis.
        #[serde(default)]
        to_index: Option<usize>,
    },
}

impl ClientIntent {
    /// Short name of the intent, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ClientIntent::SignIn { .. } => "sign-in",
            ClientIntent::CreateAccount { .. } => "create-account",
            ClientIntent::GetGames => "get-games",
            ClientIntent::CreateGame { .. } => "create-game",
            ClientIntent::JoinGame { .. } => "join-game",
            ClientIntent::ThrowSticks => "throw-sticks",
            ClientIntent::MovePiece { .. } => "move-piece",
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Everything the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Protocol progress notification; the nested tag carries the
    /// status name, so the wire shape is `{type, status, ...}`.
    Status(StatusEvent),

    /// Authoritative board state for seated players.
    BoardInfo {
        /// The snapshot itself.
        data: BoardSnapshot,
    },

    /// Presence update, broadcast to every connection.
    OnlineCount {
        /// Connections currently open.
        count: usize,
    },

    /// A rejected request. Never fatal to the connection itself.
    FatalError {
        /// Short classification shown as the dialog title.
        title: String,
        /// What went wrong.
        message: String,
    },

    /// Free-form informational text.
    Message {
        /// The text.
        text: String,
    },
}

/// Protocol progress events, tagged by `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StatusEvent {
    /// Connection acknowledged; nothing known about the client yet.
    Unknown,

    /// Sign-in or account creation succeeded.
    LoggedIn {
        /// The bound account name.
        username: String,
    },

    /// The joinable games visible to the caller.
    GameList {
        /// One entry per game.
        games: Vec<GameListEntry>,
    },

    /// The caller took a seat.
    JoinedGame {
        /// Name of the joined game.
        name: String,
    },

    /// Static board layout, pushed once after seating.
    #[serde(rename_all = "camelCase")]
    BoardSetup {
        /// Seat policy of the game.
        mode: PlayMode,
        /// Displayed house numbers in storage order.
        labels: Vec<u8>,
        /// Pixel centre of each house, for the client's renderer.
        home_coordinates: Vec<[i32; 2]>,
        /// Game name.
        name: String,
        /// The receiver's colour; absent in Single mode where the lone
        /// seat plays both.
        #[serde(skip_serializing_if = "Option::is_none")]
        your_colour: Option<Colour>,
    },

    /// The game has been decided.
    Winner {
        /// The colour that cleared its pieces first.
        colour: Colour,
    },
}

/// One row of the game list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameListEntry {
    /// Game name.
    pub name: String,
    /// Seat policy.
    pub mode: PlayMode,
    /// Creator's account name.
    pub owner: String,
}

/// Authoritative board state, sent to seated players after every
/// state-changing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    /// Players currently seated.
    pub player_count: usize,
    /// Seats the mode admits.
    pub max: usize,
    /// Occupancy in storage order.
    pub board: Vec<Option<Colour>>,
    /// Pixel centre of each house, mirroring the setup payload.
    pub positions: Vec<[i32; 2]>,
    /// Colour holding the turn.
    pub turn_colour: Colour,
    /// The cast waiting to be spent, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throw_result: Option<StickThrow>,
    /// Pieces at Anubis as `[white, black]`.
    pub exited_counts: [u8; 2],
    /// Colour the receiving seat may move, when it is anyone's move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movable_colour: Option<Colour>,
}

/// Pixel centre of every house in storage order. Cosmetic layout data
/// for the client renderer; nothing authoritative depends on it.
pub fn home_coordinates() -> Vec<[i32; 2]> {
    const PADDING: i32 = 14;
    const CELL: i32 = 54;
    const BORDER: i32 = 12;
    let pitch = CELL + BORDER;
    let half = CELL / 2;

    let mut coords = Vec::with_capacity(HOUSE_COUNT);
    for row in 1..=3 {
        for col in 1..=10 {
            coords.push([PADDING + col * pitch - half, PADDING + row * pitch - half]);
        }
    }
    coords
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientEnvelope {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        let sid = Uuid::new_v4();
        let json = format!(
            r#"{{"sid":"{}","event":"sign-in","username":"alice","password":"hunter2"}}"#,
            sid
        );
        let envelope = ClientEnvelope::from_json(&json).unwrap();
        assert_eq!(envelope.sid, sid);
        assert!(matches!(
            envelope.intent,
            ClientIntent::SignIn { ref username, .. } if username == "alice"
        ));
    }

    #[test]
    fn test_move_piece_fields_are_camel_case() {
        let sid = Uuid::new_v4();
        let json = format!(
            r#"{{"sid":"{}","event":"move-piece","fromIndex":11,"toIndex":20}}"#,
            sid
        );
        let envelope = ClientEnvelope::from_json(&json).unwrap();
        assert!(matches!(
            envelope.intent,
            ClientIntent::MovePiece {
                from_index: 11,
                to_index: Some(20)
            }
        ));
    }

    #[test]
    fn test_move_piece_without_target_requests_exit() {
        let sid = Uuid::new_v4();
        let json = format!(r#"{{"sid":"{}","event":"move-piece","fromIndex":29}}"#, sid);
        let envelope = ClientEnvelope::from_json(&json).unwrap();
        assert!(matches!(
            envelope.intent,
            ClientIntent::MovePiece {
                from_index: 29,
                to_index: None
            }
        ));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let sid = Uuid::new_v4();
        let json = format!(r#"{{"sid":"{}","event":"play-again"}}"#, sid);
        assert!(ClientEnvelope::from_json(&json).is_err());
    }

    #[test]
    fn test_status_nests_under_type() {
        let msg = ServerMessage::Status(StatusEvent::LoggedIn {
            username: "alice".into(),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""status":"logged-in""#));
        assert!(json.contains(r#""username":"alice""#));

        let parsed = ServerMessage::from_json(&json).unwrap();
        assert!(matches!(
            parsed,
            ServerMessage::Status(StatusEvent::LoggedIn { ref username }) if username == "alice"
        ));
    }

    #[test]
    fn test_board_setup_roundtrip() {
        use crate::game::board::Board;

        let msg = ServerMessage::Status(StatusEvent::BoardSetup {
            mode: PlayMode::Double,
            labels: Board::labels().to_vec(),
            home_coordinates: home_coordinates(),
            name: "duel".into(),
            your_colour: Some(Colour::White),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""status":"board-setup""#));
        assert!(json.contains(r#""homeCoordinates""#));
        assert!(json.contains(r#""yourColour":"white""#));

        let _ = ServerMessage::from_json(&json).unwrap();
    }

    #[test]
    fn test_board_setup_omits_colour_in_single_mode() {
        let msg = ServerMessage::Status(StatusEvent::BoardSetup {
            mode: PlayMode::Single,
            labels: vec![],
            home_coordinates: vec![],
            name: "solo".into(),
            your_colour: None,
        });
        let json = msg.to_json().unwrap();
        assert!(!json.contains("yourColour"));
        assert!(json.contains(r#""mode":"single""#));
    }

    #[test]
    fn test_board_snapshot_field_names() {
        let msg = ServerMessage::BoardInfo {
            data: BoardSnapshot {
                player_count: 1,
                max: 2,
                board: vec![None; HOUSE_COUNT],
                positions: home_coordinates(),
                turn_colour: Colour::Black,
                throw_result: None,
                exited_counts: [0, 0],
                movable_colour: Some(Colour::Black),
            },
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"board-info""#));
        assert!(json.contains(r#""playerCount":1"#));
        assert!(json.contains(r#""turnColour":"black""#));
        assert!(json.contains(r#""exitedCounts":[0,0]"#));
        assert!(!json.contains("throwResult"));
    }

    #[test]
    fn test_home_coordinates_match_board_layout() {
        let coords = home_coordinates();
        assert_eq!(coords.len(), HOUSE_COUNT);
        // padding 14, cell 54, border 12: first centre at 14 + 66 - 27.
        assert_eq!(coords[0], [53, 53]);
        assert_eq!(coords[9], [14 + 10 * 66 - 27, 53]);
        assert_eq!(coords[29], [14 + 10 * 66 - 27, 14 + 3 * 66 - 27]);
    }

    #[test]
    fn test_fatal_error_shape() {
        let msg = ServerMessage::FatalError {
            title: "Connection Error".into(),
            message: "Connection unrecognised".into(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"fatal-error""#));
        assert!(json.contains("Connection unrecognised"));
    }

    #[test]
    fn test_online_count_broadcast_shape() {
        let json = ServerMessage::OnlineCount { count: 3 }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"online-count","count":3}"#);
    }
}
