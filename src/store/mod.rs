/// Persistence module
///
/// The orchestration layer depends only on the two narrow capability traits
/// defined here. Postgres implementations back the running server; the
/// in-memory implementations back the end-to-end tests.

mod friendships;
mod memory;
mod users;

pub use friendships::PgFriendshipStore;
pub use memory::InMemoryFriendshipStore;
pub use memory::InMemoryUserStore;
pub use users::PgUserStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    FriendshipPair, FriendshipRecord, FriendshipStatus, NewUser, RefreshSession, UserRecord,
};

/// What a store call can fail with, independent of the backing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness rule was violated; names the duplicated thing
    /// ("username", "email" or "friendship").
    Duplicate(&'static str),
    /// A referenced account does not exist.
    MissingAccount,
    /// Anything else the engine reported.
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Duplicate(what) => write!(f, "duplicate {}", what),
            StoreError::MissingAccount => write!(f, "referenced account does not exist"),
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // Constraint names are pinned by the migrations
            match db.constraint() {
                Some("users_username_lower_key") => return StoreError::Duplicate("username"),
                Some("users_email_key") => return StoreError::Duplicate("email"),
                Some("friendships_direction_key") => return StoreError::Duplicate("friendship"),
                Some(name) if name.ends_with("_fkey") => return StoreError::MissingAccount,
                _ => {}
            }
        }
        StoreError::Database(e.to_string())
    }
}

/// Account persistence capabilities needed by the auth flows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive username lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Creates the account with empty profile text and fresh timestamps.
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError>;

    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError>;

    /// The account's effective role; accounts without an explicit row are
    /// plain users. "Admin" wins when several roles are assigned.
    async fn role_of(&self, user_id: Uuid) -> Result<String, StoreError>;

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Overwrites the refresh session unconditionally; `None` clears it.
    async fn update_session(
        &self,
        user_id: Uuid,
        session: Option<RefreshSession>,
    ) -> Result<(), StoreError>;

    /// Replaces the stored refresh session only if the stored token still
    /// equals `current_token`. Returns whether the swap happened; a `false`
    /// means another call rotated (or revoked) the session first.
    async fn rotate_session(
        &self,
        user_id: Uuid,
        current_token: &str,
        next: RefreshSession,
    ) -> Result<bool, StoreError>;
}

/// Friendship persistence capabilities.
///
/// A relationship is two mirrored directed rows; every mutation touches
/// both rows in one transaction. A pair "resolves" only when exactly two
/// rows match the unordered pair, so partial state reads as no relationship.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    /// Returns the pair oriented so `a_to_b.user_a_id == a`, or `None` when
    /// the pair does not resolve.
    async fn get(&self, a: Uuid, b: Uuid) -> Result<Option<FriendshipPair>, StoreError>;

    /// Creates both directed rows with status Pending.
    async fn create(&self, a: Uuid, b: Uuid) -> Result<FriendshipPair, StoreError>;

    /// Sets both rows to `status`. Returns `false` when the pair does not
    /// resolve; nothing is written in that case.
    async fn update(&self, a: Uuid, b: Uuid, status: FriendshipStatus)
        -> Result<bool, StoreError>;

    /// Removes both rows. Returns `false` when the pair does not resolve;
    /// nothing is removed in that case.
    async fn delete(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError>;

    /// Every directed row currently carrying `status`.
    async fn edges_with_status(
        &self,
        status: FriendshipStatus,
    ) -> Result<Vec<FriendshipRecord>, StoreError>;
}
