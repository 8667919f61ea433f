use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    notification::Notification,
    post::{NewPost, PostRow},
    user::{ProfileStats, ProfileUpdate, User},
};

/// Query collaborator: the relational interface of the hosted backend.
///
/// Post windows are ordered by `created_at DESC, id DESC` and cut with
/// offset/limit. Rows carry the author's public fields and fire level when the
/// join succeeded.
#[async_trait]
pub trait Repository: Send + Sync {
    // Feed
    async fn fetch_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRow>>;
    async fn fetch_user_posts(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<PostRow>>;
    async fn insert_post(&self, post: NewPost) -> Result<PostRow>;

    // Users
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User>;
    async fn profile_stats(&self, user_id: &str) -> Result<ProfileStats>;

    // Follow graph
    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool>;
    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()>;
    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<()>;

    async fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>>;
}
