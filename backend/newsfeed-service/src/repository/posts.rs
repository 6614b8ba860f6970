use super::{from_db_id, to_db_id, PostRepository};
use crate::domain::models::{NewPost, Post, PostUpdate};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: from_db_id(row.id),
            user_id: from_db_id(row.user_id),
            content: row.content,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL-backed [`PostRepository`]
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (user_id, content, image_url)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, content, image_url, created_at, updated_at
            "#,
        )
        .bind(to_db_id(post.user_id))
        .bind(&post.content)
        .bind(&post.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, user_id, content, image_url, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(to_db_id(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn get_by_user(&self, user_id: u64, limit: u32, offset: u64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, user_id, content, image_url, created_at, updated_at
            FROM posts
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(to_db_id(user_id))
        .bind(i64::from(limit))
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM posts WHERE user_id = $1")
            .bind(to_db_id(user_id))
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(from_db_id).collect())
    }

    async fn get_by_authors(&self, author_ids: &[u64], limit: u64) -> Result<Vec<Post>> {
        if author_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = author_ids.iter().copied().map(to_db_id).collect();
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, user_id, content, image_url, created_at, updated_at
            FROM posts
            WHERE user_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(ids)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn update(&self, update: &PostUpdate) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET content = $2, image_url = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, content, image_url, created_at, updated_at
            "#,
        )
        .bind(to_db_id(update.id))
        .bind(&update.content)
        .bind(&update.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn delete_cascade(&self, id: u64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(to_db_id(id))
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(to_db_id(id))
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(to_db_id(id))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
