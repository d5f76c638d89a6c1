/// Domain records shared by the stores, the handlers and the tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored account row.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub about: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// The account's active refresh session, if any.
    ///
    /// Token and expiry are persisted as two nullable columns but only mean
    /// something together; a row carrying one without the other is treated
    /// as having no session.
    pub fn refresh_session(&self) -> Option<RefreshSession> {
        match (&self.refresh_token, &self.refresh_token_expires_at) {
            (Some(token), Some(expires_at)) => Some(RefreshSession {
                token: token.clone(),
                expires_at: *expires_at,
            }),
            _ => None,
        }
    }
}

/// Input for account creation. Id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A refresh token and its expiry, always written and cleared as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Relationship status shared by both directed rows of a pair.
///
/// Stored as the uppercase name in the `status` text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Friends,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "PENDING",
            FriendshipStatus::Friends => "FRIENDS",
            FriendshipStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(FriendshipStatus::Pending),
            "FRIENDS" => Some(FriendshipStatus::Friends),
            "BLOCKED" => Some(FriendshipStatus::Blocked),
            _ => None,
        }
    }
}

impl std::fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directed row: the subject's view of its relationship with the object.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendshipRecord {
    pub friendship_id: Uuid,
    pub user_a_id: Option<Uuid>,
    pub user_b_id: Option<Uuid>,
    pub status: FriendshipStatus,
}

/// Both directed rows of one logical relationship, oriented so that
/// `a_to_b` is the row whose subject is the first account the caller named.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendshipPair {
    pub a_to_b: FriendshipRecord,
    pub b_to_a: FriendshipRecord,
}

impl FriendshipPair {
    pub fn status(&self) -> FriendshipStatus {
        self.a_to_b.status
    }
}
