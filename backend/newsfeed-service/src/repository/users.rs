use super::{from_db_id, to_db_id, UserRepository};
use crate::domain::models::{NewUser, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    birthday: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: from_db_id(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            birthday: row.birthday,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, birthday, created_at, updated_at";

/// PostgreSQL-backed [`UserRepository`]
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}

#[async_trait::async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, birthday)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, first_name, last_name, birthday,
                      created_at, updated_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(to_db_id(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_optional_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_optional_by("email", email).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, first_name = $4, last_name = $5,
                birthday = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, password_hash, first_name, last_name, birthday,
                      created_at, updated_at
            "#,
        )
        .bind(to_db_id(user.id))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        // Posts, comments, likes and follow edges cascade at the schema level
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(to_db_id(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn follow(&self, follower_id: u64, following_id: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO followers (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(to_db_id(follower_id))
        .bind(to_db_id(following_id))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unfollow(&self, follower_id: u64, following_id: u64) -> Result<()> {
        sqlx::query("DELETE FROM followers WHERE follower_id = $1 AND following_id = $2")
            .bind(to_db_id(follower_id))
            .bind(to_db_id(following_id))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_followers(&self, user_id: u64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name,
                   u.birthday, u.created_at, u.updated_at
            FROM users u
            JOIN followers f ON f.follower_id = u.id
            WHERE f.following_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(to_db_id(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_following(&self, user_id: u64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name,
                   u.birthday, u.created_at, u.updated_at
            FROM users u
            JOIN followers f ON f.following_id = u.id
            WHERE f.follower_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(to_db_id(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
