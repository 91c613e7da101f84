//! Game Registry
//!
//! Owns every live game, keyed by name. Creation checks the owner
//! against the account store; joining enforces the seat policy before
//! the session itself assigns a colour. Connections hold `Arc` handles;
//! a game outlives its seats and is only forgotten at process teardown,
//! so a half-played game can be rejoined.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::game::board::Colour;
use crate::game::session::{GameSession, PlayMode};
use crate::network::accounts::AccountStore;
use crate::network::protocol::{GameListEntry, ServerMessage};

/// Registry failures, surfaced to the client as fatal-error payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A game with that name already exists.
    #[error("A game with that name already exists")]
    NameTaken,

    /// The claimed owner is not a registered account.
    #[error("Unknown game owner")]
    OwnerUnknown,

    /// No game with that name.
    #[error("No such game")]
    NotFound,

    /// The supplied password does not open the game.
    #[error("Incorrect game password")]
    WrongPassword,

    /// Every seat the mode admits is taken.
    #[error("The game is full")]
    Full,

    /// Single games admit only their creator.
    #[error("That game belongs to its owner")]
    NotOwnersGame,

    /// A Double game opens to strangers only once the owner is seated.
    #[error("The owner has not opened the room yet")]
    RoomNotOpen,
}

/// All live games.
pub struct GameRegistry {
    games: RwLock<BTreeMap<String, Arc<Mutex<GameSession>>>>,
    accounts: Arc<AccountStore>,
}

impl GameRegistry {
    /// Create an empty registry backed by the given account store.
    pub fn new(accounts: Arc<AccountStore>) -> Self {
        Self {
            games: RwLock::new(BTreeMap::new()),
            accounts,
        }
    }

    /// Create a game. The creator is not seated yet; callers follow up
    /// with [`join`](Self::join).
    pub async fn create(
        &self,
        name: &str,
        owner: &str,
        mode: PlayMode,
        password: Option<String>,
    ) -> Result<Arc<Mutex<GameSession>>, RegistryError> {
        if !self.accounts.exists(owner).await {
            return Err(RegistryError::OwnerUnknown);
        }
        let mut games = self.games.write().await;
        if games.contains_key(name) {
            return Err(RegistryError::NameTaken);
        }
        let session = Arc::new(Mutex::new(GameSession::new(
            name.to_string(),
            owner.to_string(),
            mode,
            password,
        )));
        games.insert(name.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Seat `identity` in a named game.
    ///
    /// Policy, checked in order: the password must open the game; a
    /// Single game admits only its creator and only once; a Double game
    /// gives the owner either open seat but strangers only the second
    /// seat, after the owner has arrived.
    pub async fn join(
        &self,
        name: &str,
        identity: &str,
        password: Option<&str>,
        conn: Uuid,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(Arc<Mutex<GameSession>>, Colour), RegistryError> {
        let handle = self.get(name).await.ok_or(RegistryError::NotFound)?;
        let mut session = handle.lock().await;

        if !session.password_matches(password) {
            return Err(RegistryError::WrongPassword);
        }
        if session.is_full() {
            return Err(RegistryError::Full);
        }
        match session.mode() {
            PlayMode::Single => {
                if identity != session.owner() {
                    return Err(RegistryError::NotOwnersGame);
                }
            }
            PlayMode::Double => {
                if identity != session.owner() && !session.is_seated(session.owner()) {
                    return Err(RegistryError::RoomNotOpen);
                }
            }
        }

        let colour = session
            .seat(identity.to_string(), conn, sender)
            .map_err(|_| RegistryError::Full)?;
        drop(session);
        Ok((handle, colour))
    }

    /// Look up a game by name.
    pub async fn get(&self, name: &str) -> Option<Arc<Mutex<GameSession>>> {
        self.games.read().await.get(name).cloned()
    }

    /// Games visible to `identity`: their own Single games plus every
    /// Double game.
    pub async fn list(&self, identity: &str) -> Vec<GameListEntry> {
        let games = self.games.read().await;
        let mut entries = Vec::new();
        for handle in games.values() {
            let session = handle.lock().await;
            let visible = match session.mode() {
                PlayMode::Single => session.owner() == identity,
                PlayMode::Double => true,
            };
            if visible {
                entries.push(GameListEntry {
                    name: session.name().to_string(),
                    mode: session.mode(),
                    owner: session.owner().to_string(),
                });
            }
        }
        entries
    }

    /// Number of live games.
    pub async fn count(&self) -> usize {
        self.games.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> mpsc::Sender<ServerMessage> {
        mpsc::channel(16).0
    }

    async fn store_with(users: &[&str]) -> Arc<AccountStore> {
        let store = Arc::new(AccountStore::new());
        for user in users {
            store.create(user, "pw", Uuid::new_v4()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_create_requires_a_known_owner() {
        let registry = GameRegistry::new(store_with(&[]).await);
        let err = registry
            .create("duel", "ghost", PlayMode::Double, None)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::OwnerUnknown);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_names() {
        let registry = GameRegistry::new(store_with(&["alice"]).await);
        registry
            .create("duel", "alice", PlayMode::Double, None)
            .await
            .unwrap();
        let err = registry
            .create("duel", "alice", PlayMode::Double, None)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::NameTaken);
    }

    #[tokio::test]
    async fn test_single_game_admits_only_the_creator_once() {
        let registry = GameRegistry::new(store_with(&["alice", "bob"]).await);
        registry
            .create("solo", "alice", PlayMode::Single, None)
            .await
            .unwrap();

        assert_eq!(
            registry
                .join("solo", "bob", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::NotOwnersGame
        );

        registry
            .join("solo", "alice", None, Uuid::new_v4(), sender())
            .await
            .unwrap();

        assert_eq!(
            registry
                .join("solo", "alice", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::Full
        );
    }

    #[tokio::test]
    async fn test_double_game_opens_to_strangers_after_the_owner() {
        let registry = GameRegistry::new(store_with(&["alice", "bob", "carol"]).await);
        registry
            .create("duel", "alice", PlayMode::Double, None)
            .await
            .unwrap();

        // Stranger first: the room is not open yet.
        assert_eq!(
            registry
                .join("duel", "bob", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::RoomNotOpen
        );

        let (_, owner_colour) = registry
            .join("duel", "alice", None, Uuid::new_v4(), sender())
            .await
            .unwrap();
        let (_, guest_colour) = registry
            .join("duel", "bob", None, Uuid::new_v4(), sender())
            .await
            .unwrap();
        assert_eq!(guest_colour, owner_colour.opposite());

        assert_eq!(
            registry
                .join("duel", "carol", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::Full
        );
    }

    #[tokio::test]
    async fn test_password_mismatch_always_rejects_first() {
        let registry = GameRegistry::new(store_with(&["alice", "bob"]).await);
        registry
            .create("locked", "alice", PlayMode::Double, Some("sesame".into()))
            .await
            .unwrap();

        // Wrong password wins over the room-not-open policy.
        assert_eq!(
            registry
                .join("locked", "bob", Some("wrong"), Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::WrongPassword
        );
        assert_eq!(
            registry
                .join("locked", "alice", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::WrongPassword
        );

        registry
            .join("locked", "alice", Some("sesame"), Uuid::new_v4(), sender())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_join_unknown_game() {
        let registry = GameRegistry::new(store_with(&["alice"]).await);
        assert_eq!(
            registry
                .join("ghost", "alice", None, Uuid::new_v4(), sender())
                .await
                .unwrap_err(),
            RegistryError::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_hides_other_peoples_single_games() {
        let registry = GameRegistry::new(store_with(&["alice", "bob"]).await);
        registry
            .create("solo", "alice", PlayMode::Single, None)
            .await
            .unwrap();
        registry
            .create("duel", "bob", PlayMode::Double, None)
            .await
            .unwrap();

        let for_alice = registry.list("alice").await;
        let names: Vec<_> = for_alice.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["duel", "solo"]);

        let for_bob = registry.list("bob").await;
        let names: Vec<_> = for_bob.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["duel"]);
    }

    #[tokio::test]
    async fn test_game_survives_its_last_seat_leaving() {
        let registry = GameRegistry::new(store_with(&["alice"]).await);
        registry
            .create("duel", "alice", PlayMode::Double, None)
            .await
            .unwrap();

        let conn = Uuid::new_v4();
        let (handle, first_colour) = registry
            .join("duel", "alice", None, conn, sender())
            .await
            .unwrap();
        handle.lock().await.vacate(conn);

        // The half-played game stays listed and can be rejoined.
        assert_eq!(registry.count().await, 1);
        assert!(registry.get("duel").await.is_some());
        let (_, colour) = registry
            .join("duel", "alice", None, Uuid::new_v4(), sender())
            .await
            .unwrap();
        assert_eq!(colour, first_colour);
    }
}
