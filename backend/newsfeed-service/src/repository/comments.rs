use super::{from_db_id, to_db_id, CommentRepository};
use crate::domain::models::{Comment, NewComment};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: from_db_id(row.id),
            post_id: from_db_id(row.post_id),
            user_id: from_db_id(row.user_id),
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed [`CommentRepository`]
#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(to_db_id(comment.post_id))
        .bind(to_db_id(comment.user_id))
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, user_id, content, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(to_db_id(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, post_id, user_id, content, created_at, updated_at
            FROM comments
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

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn get_ids_by_post(&self, post_id: u64) -> Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM comments WHERE post_id = $1")
            .bind(to_db_id(post_id))
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(from_db_id).collect())
    }

    async fn get_refs_by_user(&self, user_id: u64) -> Result<Vec<(u64, u64)>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT id, post_id FROM comments WHERE user_id = $1")
                .bind(to_db_id(user_id))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, post_id)| (from_db_id(id), from_db_id(post_id)))
            .collect())
    }

    async fn update(&self, id: u64, content: &str) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            UPDATE comments
            SET content = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, post_id, user_id, content, created_at, updated_at
            "#,
        )
        .bind(to_db_id(id))
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Comment::from))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(to_db_id(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
