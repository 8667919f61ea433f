// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::post::PostAuthor;

/// Represents the 'users' table of the hosted backend.
/// Rows are created by the identity provider; only the viewer's own row is ever written.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// Unique, immutable username.
    pub username: String,

    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,

    pub is_verified: bool,
    pub is_online: bool,

    pub posts_count: i64,
    pub followers_count: i64,
    /// Aggregate engagement ("fire") score.
    pub fire_score: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    pub fn author(&self) -> PostAuthor {
        PostAuthor {
            id: self.id.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            is_verified: self.is_verified,
        }
    }

    /// Display name when set, username otherwise.
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Follow graph and post counters shown on a profile header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct ProfileStats {
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
}

/// DTO for the settings screen.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 50, message = "Display name must be at most 50 characters"))]
    pub display_name: String,

    #[validate(length(max = 300, message = "Bio must be at most 300 characters"))]
    pub bio: String,

    #[validate(length(max = 100, message = "City must be at most 100 characters"))]
    pub city: String,
}
