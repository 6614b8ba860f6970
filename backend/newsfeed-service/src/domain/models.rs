use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
///
/// `password_hash` arrives already hashed and is cached as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<DateTime<Utc>>,
}

/// Profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub id: u64,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<DateTime<Utc>>,
}

impl UserUpdate {
    pub fn apply_to(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if self.birthday.is_some() {
            user.birthday = self.birthday;
        }
    }
}

/// Post row. Likes and comments are attached only in [`PostView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: u64,
    pub content: String,
    pub image_url: Option<String>,
}

/// Post edit. The owner is never part of an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostUpdate {
    pub id: u64,
    pub content: String,
    pub image_url: Option<String>,
}

/// Comment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: u64,
    pub user_id: u64,
    pub content: String,
}

/// Like entity - at most one per (post, user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: u64,
    pub post_id: u64,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
}

/// A post materialized for a response, with its engagement attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}
