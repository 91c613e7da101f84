//! Account Store
//!
//! In-memory credential store: username to password digest, plus the
//! binding between a signed-in identity and the live connection holding
//! it. Passwords are digested on arrival and never kept in plaintext.
//! Nothing here persists; a restart forgets every account.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Domain prefix for credential digests, so the same password in
/// another context hashes differently.
const DIGEST_DOMAIN: &str = "senet-account:v1";

/// Account failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// No account with that username.
    #[error("Incorrect credentials")]
    UnknownUser,

    /// The password digest does not match.
    #[error("Incorrect credentials")]
    WrongPassword,

    /// The identity is bound to a live connection.
    #[error("Account is in use")]
    AlreadySignedIn,

    /// The username is already registered.
    #[error("That username is taken")]
    UsernameTaken,
}

/// One registered account.
#[derive(Debug, Clone)]
struct Account {
    /// Hex SHA-256 of the domain-prefixed credentials.
    digest: String,
    /// Connection currently signed in as this identity, if any.
    bound: Option<Uuid>,
    /// When the account was registered.
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

/// All registered accounts and their connection bindings.
pub struct AccountStore {
    accounts: RwLock<BTreeMap<String, Account>>,
}

impl AccountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a new account and bind it to the creating connection;
    /// account creation doubles as sign-in.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        conn: Uuid,
    ) -> Result<(), AccountError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            return Err(AccountError::UsernameTaken);
        }
        accounts.insert(
            username.to_string(),
            Account {
                digest: credential_digest(username, password),
                bound: Some(conn),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Bind an existing identity to a connection. Exact credentials
    /// required; an identity bound elsewhere stays untouched.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        conn: Uuid,
    ) -> Result<(), AccountError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(username).ok_or(AccountError::UnknownUser)?;
        if account.digest != credential_digest(username, password) {
            return Err(AccountError::WrongPassword);
        }
        match account.bound {
            Some(existing) if existing != conn => Err(AccountError::AlreadySignedIn),
            _ => {
                account.bound = Some(conn);
                Ok(())
            }
        }
    }

    /// Unbind whatever identity the connection holds, freeing it for
    /// immediate re-sign-in. Returns the released username, if any.
    pub async fn release(&self, conn: Uuid) -> Option<String> {
        let mut accounts = self.accounts.write().await;
        for (name, account) in accounts.iter_mut() {
            if account.bound == Some(conn) {
                account.bound = None;
                return Some(name.clone());
            }
        }
        None
    }

    /// Whether the username is registered.
    pub async fn exists(&self, username: &str) -> bool {
        self.accounts.read().await.contains_key(username)
    }

    /// Whether the identity is bound to a live connection.
    pub async fn is_bound(&self, username: &str) -> bool {
        self.accounts
            .read()
            .await
            .get(username)
            .is_some_and(|a| a.bound.is_some())
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex SHA-256 over the domain-prefixed username and password.
fn credential_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
