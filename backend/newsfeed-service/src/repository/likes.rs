use super::{from_db_id, to_db_id, LikeRepository};
use crate::domain::models::Like;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct LikeRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl From<LikeRow> for Like {
    fn from(row: LikeRow) -> Self {
        Self {
            id: from_db_id(row.id),
            post_id: from_db_id(row.post_id),
            user_id: from_db_id(row.user_id),
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed [`LikeRepository`]
#[derive(Clone)]
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LikeRepository for PgLikeRepository {
    async fn create(&self, post_id: u64, user_id: u64) -> Result<Option<Like>> {
        // A concurrent duplicate loses on the unique constraint and yields no row
        let row = sqlx::query_as::<_, LikeRow>(
            r#"
            INSERT INTO likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            RETURNING id, post_id, user_id, created_at
            "#,
        )
        .bind(to_db_id(post_id))
        .bind(to_db_id(user_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Like::from))
    }

    async fn delete(&self, post_id: u64, user_id: u64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM likes
            WHERE post_id = $1 AND user_id = $2
            "#,
        )
        .bind(to_db_id(post_id))
        .bind(to_db_id(user_id))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, post_id: u64, user_id: u64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM likes
                WHERE post_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(to_db_id(post_id))
        .bind(to_db_id(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Like>> {
        let rows = sqlx::query_as::<_, LikeRow>(
            r#"
            SELECT id, post_id, user_id, created_at
            FROM likes
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(to_db_id(post_id))
        .bind(i64::from(limit))
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Like::from).collect())
    }

    async fn get_post_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT post_id FROM likes WHERE user_id = $1")
            .bind(to_db_id(user_id))
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(from_db_id).collect())
    }

    async fn count_by_post(&self, post_id: u64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM likes
            WHERE post_id = $1
            "#,
        )
        .bind(to_db_id(post_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
