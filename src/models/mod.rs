use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_POST_CATEGORY: &str = "general discussion";
pub const DEFAULT_RESOURCE_CATEGORY: &str = "uncategorized";

/// A full user row, including the password hash. Never serialized directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub avatar: Option<String>,
}

/// The public profile returned by the API.
#[derive(Debug, Serialize, Clone)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub avatar: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CulturalResource {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub created_date: DateTime<Utc>,
    pub author_id: i64,
    pub author: PublicUser,
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub likes_count: i64,
    pub views: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub author: PublicUser,
}

#[derive(Debug, Serialize, Clone)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub post_id: i64,
    pub author: PublicUser,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Liked,
    Unliked,
}

/// Result of flipping a user's like on a post.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct LikeToggle {
    pub action: LikeAction,
    pub liked: bool,
    pub likes: i64,
}

/// Partial update for a cultural resource. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct ResourceChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Partial update for a post. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
}

/// One page of rows plus the bookkeeping the list endpoints report.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, current_page: i64, per_page: i64) -> Self {
        let pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Page { items, total, pages, current_page }
    }
}

pub mod db_operations;
