/// In-memory store implementations
///
/// Behavioral doubles for the Postgres stores: same uniqueness rules,
/// same exactly-two-rows pair resolution, same guarded session rotation.
/// The end-to-end suites run the real HTTP server against these, so no
/// test needs a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::model::{
    FriendshipPair, FriendshipRecord, FriendshipStatus, NewUser, RefreshSession, UserRecord,
};
use crate::store::friendships::resolve_pair;
use crate::store::{FriendshipStore, StoreError, UserStore};

#[derive(Default)]
struct UserState {
    users: Vec<UserRecord>,
    roles: HashMap<Uuid, Vec<String>>,
}

#[derive(Default)]
pub struct InMemoryUserStore {
    state: Mutex<UserState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, UserState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state()?;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        let mut state = self.state()?;

        if state
            .users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(&new_user.username))
        {
            return Err(StoreError::Duplicate("username"));
        }
        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Duplicate("email"));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            about: String::new(),
            created_at: now,
            modified_at: now,
            refresh_token: None,
            refresh_token_expires_at: None,
        };
        state.users.push(record.clone());

        Ok(record)
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;

        if !state.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::MissingAccount);
        }
        state
            .roles
            .entry(user_id)
            .or_default()
            .push(role.to_string());

        Ok(())
    }

    async fn role_of(&self, user_id: Uuid) -> Result<String, StoreError> {
        let state = self.state()?;
        // Matches the Postgres store: lowest-sorting role wins, so "Admin"
        // beats "User"
        Ok(state
            .roles
            .get(&user_id)
            .and_then(|roles| roles.iter().min())
            .cloned()
            .unwrap_or_else(|| "User".to_string()))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let state = self.state()?;
        Ok(state.users.clone())
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session: Option<RefreshSession>,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::MissingAccount)?;

        match session {
            Some(session) => {
                user.refresh_token = Some(session.token);
                user.refresh_token_expires_at = Some(session.expires_at);
            }
            None => {
                user.refresh_token = None;
                user.refresh_token_expires_at = None;
            }
        }
        user.modified_at = Utc::now();

        Ok(())
    }

    async fn rotate_session(
        &self,
        user_id: Uuid,
        current_token: &str,
        next: RefreshSession,
    ) -> Result<bool, StoreError> {
        let mut state = self.state()?;

        let user = match state
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.refresh_token.as_deref() == Some(current_token))
        {
            Some(user) => user,
            None => return Ok(false),
        };

        user.refresh_token = Some(next.token);
        user.refresh_token_expires_at = Some(next.expires_at);
        user.modified_at = Utc::now();

        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryFriendshipStore {
    rows: Mutex<Vec<FriendshipRecord>>,
}

impl InMemoryFriendshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<FriendshipRecord>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Database("friendship store lock poisoned".to_string()))
    }
}

fn matches_pair(row: &FriendshipRecord, a: Uuid, b: Uuid) -> bool {
    (row.user_a_id == Some(a) && row.user_b_id == Some(b))
        || (row.user_a_id == Some(b) && row.user_b_id == Some(a))
}

#[async_trait]
impl FriendshipStore for InMemoryFriendshipStore {
    async fn get(&self, a: Uuid, b: Uuid) -> Result<Option<FriendshipPair>, StoreError> {
        let rows = self.rows()?;
        let matching = rows
            .iter()
            .filter(|r| matches_pair(r, a, b))
            .cloned()
            .collect();

        Ok(resolve_pair(matching, a, b))
    }

    async fn create(&self, a: Uuid, b: Uuid) -> Result<FriendshipPair, StoreError> {
        let mut rows = self.rows()?;

        // Either directed row existing blocks the insert, as the per-direction
        // unique index does in Postgres
        if rows.iter().any(|r| matches_pair(r, a, b)) {
            return Err(StoreError::Duplicate("friendship"));
        }

        let status = FriendshipStatus::Pending;
        let a_to_b = FriendshipRecord {
            friendship_id: Uuid::new_v4(),
            user_a_id: Some(a),
            user_b_id: Some(b),
            status,
        };
        let b_to_a = FriendshipRecord {
            friendship_id: Uuid::new_v4(),
            user_a_id: Some(b),
            user_b_id: Some(a),
            status,
        };
        rows.push(a_to_b.clone());
        rows.push(b_to_a.clone());

        Ok(FriendshipPair { a_to_b, b_to_a })
    }

    async fn update(
        &self,
        a: Uuid,
        b: Uuid,
        status: FriendshipStatus,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows()?;

        let matching = rows
            .iter()
            .filter(|r| matches_pair(r, a, b))
            .cloned()
            .collect();
        if resolve_pair(matching, a, b).is_none() {
            return Ok(false);
        }

        for row in rows.iter_mut().filter(|r| matches_pair(r, a, b)) {
            row.status = status;
        }

        Ok(true)
    }

    async fn delete(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows()?;

        let matching = rows
            .iter()
            .filter(|r| matches_pair(r, a, b))
            .cloned()
            .collect();
        if resolve_pair(matching, a, b).is_none() {
            return Ok(false);
        }

        rows.retain(|r| !matches_pair(r, a, b));

        Ok(true)
    }

    async fn edges_with_status(
        &self,
        status: FriendshipStatus,
    ) -> Result<Vec<FriendshipRecord>, StoreError> {
        let rows = self.rows()?;
        Ok(rows.iter().filter(|r| r.status == status).cloned().collect())
    }
}
