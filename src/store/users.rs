/// Postgres-backed account store
///
/// Owns the `users` and `user_roles` tables. Uniqueness (case-insensitive
/// username, email) is enforced by the unique indexes the migrations create;
/// violations surface as [`StoreError::Duplicate`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{NewUser, RefreshSession, UserRecord};
use crate::store::{StoreError, UserStore};

/// id, username, email, password_hash, about, created_at, modified_at,
/// refresh_token, refresh_token_expires_at
type UserRow = (
    Uuid,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<String>,
    Option<DateTime<Utc>>,
);

const USER_COLUMNS: &str = "id, username, email, password_hash, about, created_at, modified_at, \
                            refresh_token, refresh_token_expires_at";

fn into_record(row: UserRow) -> UserRecord {
    UserRecord {
        id: row.0,
        username: row.1,
        email: row.2,
        password_hash: row.3,
        about: row.4,
        created_at: row.5,
        modified_at: row.6,
        refresh_token: row.7,
        refresh_token_expires_at: row.8,
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_record))
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
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

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, about, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(&record.about)
        .bind(record.created_at)
        .bind(record.modified_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn role_of(&self, user_id: Uuid) -> Result<String, StoreError> {
        // "Admin" sorts before "User", so the highest privilege wins
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.unwrap_or_else(|| "User".to_string()))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session: Option<RefreshSession>,
    ) -> Result<(), StoreError> {
        let (token, expires_at) = match session {
            Some(session) => (Some(session.token), Some(session.expires_at)),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, refresh_token_expires_at = $3, modified_at = $4
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingAccount);
        }

        Ok(())
    }

    async fn rotate_session(
        &self,
        user_id: Uuid,
        current_token: &str,
        next: RefreshSession,
    ) -> Result<bool, StoreError> {
        // Guarded overwrite: a concurrent rotation changes the stored token
        // first, the guard then matches zero rows and this call loses.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $3, refresh_token_expires_at = $4, modified_at = $5
            WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(user_id)
        .bind(current_token)
        .bind(&next.token)
        .bind(next.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
