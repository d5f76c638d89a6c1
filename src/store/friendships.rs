/// Postgres-backed friendship store
///
/// Every mutation rewrites both directed rows of a pair inside one
/// transaction, with the rows locked while held, so readers never observe a
/// half-updated relationship and concurrent mutations of the same pair
/// serialize.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{FriendshipPair, FriendshipRecord, FriendshipStatus};
use crate::store::{FriendshipStore, StoreError};

/// friendship_id, user_a_id, user_b_id, status
type FriendshipRow = (Uuid, Option<Uuid>, Option<Uuid>, String);

const PAIR_CONDITION: &str = "(user_a_id = $1 AND user_b_id = $2) \
                              OR (user_a_id = $2 AND user_b_id = $1)";

fn parse_status(s: &str) -> Result<FriendshipStatus, StoreError> {
    FriendshipStatus::parse(s)
        .ok_or_else(|| StoreError::Database(format!("unknown friendship status '{}'", s)))
}

fn into_record(row: FriendshipRow) -> Result<FriendshipRecord, StoreError> {
    Ok(FriendshipRecord {
        friendship_id: row.0,
        user_a_id: row.1,
        user_b_id: row.2,
        status: parse_status(&row.3)?,
    })
}

/// Applies the exactly-two-rows rule and orients the pair.
///
/// One row alone is partial state from a failed two-row write; it is
/// reported and treated as no relationship, and the orphan is left in
/// place for out-of-band repair.
pub(crate) fn resolve_pair(
    rows: Vec<FriendshipRecord>,
    a: Uuid,
    b: Uuid,
) -> Option<FriendshipPair> {
    if rows.len() != 2 {
        if rows.len() == 1 {
            tracing::warn!(
                user_a_id = %a,
                user_b_id = %b,
                "single directed friendship row found; treating pair as absent"
            );
        }
        return None;
    }

    let mut a_to_b = None;
    let mut b_to_a = None;
    for row in rows {
        if row.user_a_id == Some(a) && row.user_b_id == Some(b) {
            a_to_b = Some(row);
        } else if row.user_a_id == Some(b) && row.user_b_id == Some(a) {
            b_to_a = Some(row);
        }
    }

    match (a_to_b, b_to_a) {
        (Some(a_to_b), Some(b_to_a)) => {
            if a_to_b.status != b_to_a.status {
                tracing::warn!(
                    user_a_id = %a,
                    user_b_id = %b,
                    "directed friendship rows disagree on status"
                );
            }
            Some(FriendshipPair { a_to_b, b_to_a })
        }
        _ => None,
    }
}

pub struct PgFriendshipStore {
    pool: PgPool,
}

impl PgFriendshipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipStore for PgFriendshipStore {
    async fn get(&self, a: Uuid, b: Uuid) -> Result<Option<FriendshipPair>, StoreError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT friendship_id, user_a_id, user_b_id, status FROM friendships WHERE {}",
            PAIR_CONDITION
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(resolve_pair(records, a, b))
    }

    async fn create(&self, a: Uuid, b: Uuid) -> Result<FriendshipPair, StoreError> {
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

        // Both directed rows or neither
        let mut tx = self.pool.begin().await?;
        for record in [&a_to_b, &b_to_a] {
            sqlx::query(
                r#"
                INSERT INTO friendships (friendship_id, user_a_id, user_b_id, status)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record.friendship_id)
            .bind(record.user_a_id)
            .bind(record.user_b_id)
            .bind(record.status.as_str())
            .execute(&mut tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            user_a_id = %a,
            user_b_id = %b,
            "friendship pair created"
        );

        Ok(FriendshipPair { a_to_b, b_to_a })
    }

    async fn update(
        &self,
        a: Uuid,
        b: Uuid,
        status: FriendshipStatus,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows for the duration of the rewrite
        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT friendship_id, user_a_id, user_b_id, status FROM friendships \
             WHERE {} FOR UPDATE",
            PAIR_CONDITION
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&mut tx)
        .await?;

        let records = rows
            .into_iter()
            .map(into_record)
            .collect::<Result<Vec<_>, _>>()?;

        if resolve_pair(records, a, b).is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(&format!(
            "UPDATE friendships SET status = $3 WHERE {}",
            PAIR_CONDITION
        ))
        .bind(a)
        .bind(b)
        .bind(status.as_str())
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_a_id = %a,
            user_b_id = %b,
            status = status.as_str(),
            "friendship pair updated"
        );

        Ok(true)
    }

    async fn delete(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, FriendshipRow>(&format!(
            "SELECT friendship_id, user_a_id, user_b_id, status FROM friendships \
             WHERE {} FOR UPDATE",
            PAIR_CONDITION
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&mut tx)
        .await?;

        let records = rows
            .into_iter()
            .map(into_record)
            .collect::<Result<Vec<_>, _>>()?;

        if resolve_pair(records, a, b).is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(&format!("DELETE FROM friendships WHERE {}", PAIR_CONDITION))
            .bind(a)
            .bind(b)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            user_a_id = %a,
            user_b_id = %b,
            "friendship pair deleted"
        );

        Ok(true)
    }

    async fn edges_with_status(
        &self,
        status: FriendshipStatus,
    ) -> Result<Vec<FriendshipRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(
            "SELECT friendship_id, user_a_id, user_b_id, status FROM friendships \
             WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_record).collect()
    }
}
