use serde::Serialize;

use super::require_viewer;
use crate::error::{AppError, Result};
use crate::feed::ViewerLookup;
use crate::models::{
    post::{FeedPage, Post},
    user::{ProfileStats, User},
};
use crate::state::AppState;

/// Slug that always means the signed-in user.
pub const OWN_PROFILE: &str = "me";

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub stats: ProfileStats,
    pub is_own: bool,
    /// Whether the viewer follows this profile. Always false on your own.
    pub is_following: bool,
    /// First page of the user's posts, newest first.
    pub posts: Vec<Post>,
    /// More posts are available through `load_profile_posts`.
    pub has_more_posts: bool,
}

/// Loads a profile by username, or the viewer's own for `"me"`.
pub async fn load_profile(state: &AppState, slug: &str) -> Result<ProfileView> {
    let viewer = ViewerLookup::from_state(state).resolve().await;

    let user = if slug == OWN_PROFILE {
        viewer
            .clone()
            .ok_or(AppError::AuthError("Sign in required".to_string()))?
    } else {
        state
            .repo
            .get_user_by_username(slug)
            .await?
            .ok_or(AppError::NotFound(format!("User '{}' not found", slug)))?
    };

    let is_own = viewer.as_ref().is_some_and(|v| v.id == user.id);
    let is_following = match &viewer {
        Some(v) if !is_own => state.repo.is_following(&v.id, &user.id).await?,
        _ => false,
    };

    let stats = state.repo.profile_stats(&user.id).await?;
    let first = load_profile_posts(state, &user.id, 0).await?;
    let has_more_posts = first.is_full(state.page_size);

    Ok(ProfileView {
        user,
        stats,
        is_own,
        is_following,
        posts: first.posts,
        has_more_posts,
    })
}

/// Page `page` of a user's posts, using the same window size as the feed.
/// A short page is the last one.
pub async fn load_profile_posts(state: &AppState, user_id: &str, page: usize) -> Result<FeedPage> {
    let offset = page
        .checked_mul(state.page_size)
        .ok_or_else(|| AppError::BadRequest(format!("page index {} out of range", page)))?;

    let posts = state
        .repo
        .fetch_user_posts(user_id, offset, state.page_size)
        .await?
        .into_iter()
        .map(Post::from)
        .collect();

    Ok(FeedPage { index: page, posts })
}

/// Follows or unfollows `target_id`. Returns the new following state.
pub async fn toggle_follow(state: &AppState, target_id: &str) -> Result<bool> {
    let viewer = require_viewer(state).await?;
    if viewer.id == target_id {
        return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
    }

    if state.repo.get_user(target_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if state.repo.is_following(&viewer.id, target_id).await? {
        state.repo.unfollow(&viewer.id, target_id).await?;
        tracing::info!(follower = %viewer.id, following = %target_id, "unfollowed");
        Ok(false)
    } else {
        state.repo.follow(&viewer.id, target_id).await?;
        tracing::info!(follower = %viewer.id, following = %target_id, "followed");
        Ok(true)
    }
}
