use async_trait::async_trait;
use sqlx::PgPool;

use super::repository::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    notification::{Notification, NotificationRow},
    post::{NewPost, PostRow},
    user::{ProfileStats, ProfileUpdate, User},
};

/// Post columns plus the author join and the author's fire level.
/// Identifiers are UUIDs on the backend and opaque strings here.
const POST_SELECT: &str = r#"
    SELECT
        p.id::text AS id,
        p.user_id::text AS user_id,
        p.type AS media_type,
        p.media_url, p.caption, p.hashtags, p.region, p.city, p.created_at,
        p.fire_count::bigint AS fire_count,
        p.comment_count::bigint AS comment_count,
        u.username AS author_username,
        u.display_name AS author_display_name,
        u.avatar_url AS author_avatar_url,
        u.is_verified AS author_is_verified,
        (SELECT MAX(f.fire_level) FROM fires f WHERE f.user_id = p.user_id)::int AS author_fire_level
    FROM posts p
    LEFT JOIN users u ON u.id = p.user_id
"#;

const USER_SELECT: &str = r#"
    SELECT
        u.id::text AS id, u.username, u.display_name, u.avatar_url, u.bio, u.city,
        COALESCE(u.is_verified, FALSE) AS is_verified,
        COALESCE(u.is_online, FALSE) AS is_online,
        (SELECT COUNT(*) FROM posts WHERE user_id = u.id) AS posts_count,
        (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS followers_count,
        COALESCE(u.fire_score, 0)::bigint AS fire_score,
        u.created_at
    FROM users u
"#;

/// `Repository` backed by the hosted Postgres database.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn post_by_id(&self, id: &str) -> Result<PostRow> {
        let sql = format!("{} WHERE p.id = $1::uuid", POST_SELECT);
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn fetch_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        let sql = format!(
            "{} ORDER BY p.created_at DESC, p.id DESC LIMIT $1 OFFSET $2",
            POST_SELECT
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch feed window: {:?}", e);
                AppError::from(e)
            })?;
        Ok(rows)
    }

    async fn fetch_user_posts(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        let sql = format!(
            "{} WHERE p.user_id = $1::uuid ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3",
            POST_SELECT
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostRow> {
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO posts (user_id, type, media_url, caption, hashtags, region, city)
            VALUES ($1::uuid, $2, $3, $4, $5, $6, $7)
            RETURNING id::text
            "#,
        )
        .bind(&post.user_id)
        .bind(post.media_type.as_str())
        .bind(&post.media_url)
        .bind(&post.caption)
        .bind(&post.hashtags)
        .bind(&post.region)
        .bind(&post.city)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert post: {:?}", e);
            AppError::from(e)
        })?;

        self.post_by_id(&id).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE u.id = $1::uuid", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("{} WHERE u.username = $1", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET display_name = $2, bio = $3, city = $4 WHERE id = $1::uuid",
        )
        .bind(id)
        .bind(&update.display_name)
        .bind(&update.bio)
        .bind(&update.city)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.get_user(id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn profile_stats(&self, user_id: &str) -> Result<ProfileStats> {
        let stats = sqlx::query_as::<_, ProfileStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts WHERE user_id = $1::uuid) AS posts,
                (SELECT COUNT(*) FROM follows WHERE following_id = $1::uuid) AS followers,
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1::uuid) AS following
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1::uuid AND following_id = $2::uuid)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1::uuid, $2::uuid)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1::uuid AND following_id = $2::uuid")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT
                n.id::text AS id, n.type AS kind,
                a.id::text AS actor_id, a.username AS actor_username,
                a.display_name AS actor_display_name, a.avatar_url AS actor_avatar_url,
                a.is_verified AS actor_is_verified,
                n.post_id::text AS post_id, p.media_url AS post_media_url,
                n.is_read, n.created_at
            FROM notifications n
            LEFT JOIN users a ON a.id = n.actor_id
            LEFT JOIN posts p ON p.id = n.post_id
            WHERE n.user_id = $1::uuid
            ORDER BY n.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match Notification::try_from(row) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    tracing::warn!("Skipping notification: {}", e);
                    None
                }
            })
            .collect())
    }
}
