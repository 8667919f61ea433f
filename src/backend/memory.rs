//! In-process collaborators.
//!
//! `MemoryRepository` mirrors the hosted schema closely enough for local runs
//! and tests: same window ordering, same joins, same follow semantics.
//! `MemoryRealtime` fans rows out to subscribers the way the hosted change
//! feed does.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use super::realtime::{ChangeKind, RealtimeSource, Subscription};
use super::repository::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    notification::{Notification, NotificationRow},
    post::{NewPost, PostRow},
    user::{ProfileStats, ProfileUpdate, User},
};

type Subscribers = HashMap<u64, (String, mpsc::UnboundedSender<PostRow>)>;

#[derive(Default)]
pub struct MemoryRealtime {
    next_id: AtomicU64,
    subscribers: Arc<Mutex<Subscribers>>,
}

fn lock(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a created row to every subscriber of `table`. Returns how many received it.
    pub fn publish(&self, table: &str, row: PostRow) -> usize {
        let subscribers = lock(&self.subscribers);
        subscribers
            .values()
            .filter(|(topic, _)| topic == table)
            .filter(|(_, tx)| tx.send(row.clone()).is_ok())
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

#[async_trait]
impl RealtimeSource for MemoryRealtime {
    async fn subscribe(&self, table: &str, kind: ChangeKind) -> Result<Subscription> {
        let ChangeKind::Created = kind;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).insert(id, (table.to_string(), tx));

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(table, rx, move || {
            lock(&subscribers).remove(&id);
        }))
    }
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<PostRow>,
    fires: HashMap<String, i32>,
    follows: HashSet<(String, String)>,
    notifications: Vec<(String, NotificationRow)>,
}

impl Tables {
    fn joined(&self, row: &PostRow) -> PostRow {
        let mut row = row.clone();
        if let Some(author) = self.users.iter().find(|u| u.id == row.user_id) {
            row.author_username = Some(author.username.clone());
            row.author_display_name = author.display_name.clone();
            row.author_avatar_url = author.avatar_url.clone();
            row.author_is_verified = Some(author.is_verified);
        }
        row.author_fire_level = self.fires.get(&row.user_id).copied();
        row
    }

    fn window<'a>(
        &'a self,
        rows: impl Iterator<Item = &'a PostRow>,
        offset: usize,
        limit: usize,
    ) -> Vec<PostRow> {
        let mut rows: Vec<&PostRow> = rows.collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        rows.into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| self.joined(row))
            .collect()
    }

    fn with_counts(&self, user: &User) -> User {
        let mut user = user.clone();
        user.posts_count = self.posts.iter().filter(|p| p.user_id == user.id).count() as i64;
        user.followers_count = self.follows.iter().filter(|(_, to)| *to == user.id).count() as i64;
        user
    }
}

/// `Repository` kept entirely in memory.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    realtime: Option<Arc<MemoryRealtime>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserted posts are also published on `realtime` under the "posts" table.
    pub fn with_realtime(realtime: Arc<MemoryRealtime>) -> Self {
        Self {
            tables: RwLock::default(),
            realtime: Some(realtime),
        }
    }

    pub async fn add_user(&self, user: User) {
        self.tables.write().await.users.push(user);
    }

    /// Seeds a post row as-is (no realtime event).
    pub async fn add_post(&self, row: PostRow) {
        self.tables.write().await.posts.push(row);
    }

    pub async fn set_fire_level(&self, user_id: &str, level: i32) {
        self.tables.write().await.fires.insert(user_id.to_string(), level);
    }

    pub async fn add_notification(&self, user_id: &str, row: NotificationRow) {
        self.tables
            .write()
            .await
            .notifications
            .push((user_id.to_string(), row));
    }

    pub async fn post_count(&self) -> usize {
        self.tables.read().await.posts.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        let tables = self.tables.read().await;
        Ok(tables.window(tables.posts.iter(), offset, limit))
    }

    async fn fetch_user_posts(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        let tables = self.tables.read().await;
        let rows = tables.posts.iter().filter(|p| p.user_id == user_id);
        Ok(tables.window(rows, offset, limit))
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostRow> {
        let row = {
            let mut tables = self.tables.write().await;
            // keep created_at non-decreasing per insert
            let latest = tables.posts.iter().filter_map(|p| p.created_at).max();
            let created_at = latest.map_or_else(Utc::now, |latest| latest.max(Utc::now()));

            let row = PostRow {
                id: Uuid::new_v4().to_string(),
                user_id: post.user_id,
                media_type: Some(post.media_type.as_str().to_string()),
                media_url: Some(post.media_url),
                caption: Some(post.caption),
                hashtags: Some(post.hashtags),
                region: post.region,
                city: post.city,
                created_at: Some(created_at),
                fire_count: Some(0),
                comment_count: Some(0),
                ..PostRow::default()
            };
            tables.posts.push(row.clone());
            tables.joined(&row)
        };

        if let Some(realtime) = &self.realtime {
            realtime.publish("posts", row.clone());
        }
        Ok(row)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).map(|u| tables.with_counts(u)))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| tables.with_counts(u)))
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        user.display_name = Some(update.display_name.clone());
        user.bio = Some(update.bio.clone());
        user.city = Some(update.city.clone());
        let user = user.clone();
        Ok(tables.with_counts(&user))
    }

    async fn profile_stats(&self, user_id: &str) -> Result<ProfileStats> {
        let tables = self.tables.read().await;
        Ok(ProfileStats {
            posts: tables.posts.iter().filter(|p| p.user_id == user_id).count() as i64,
            followers: tables.follows.iter().filter(|(_, to)| to == user_id).count() as i64,
            following: tables.follows.iter().filter(|(from, _)| from == user_id).count() as i64,
        })
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .contains(&(follower_id.to_string(), following_id.to_string())))
    }

    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .follows
            .insert((follower_id.to_string(), following_id.to_string()));
        Ok(())
    }

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .follows
            .remove(&(follower_id.to_string(), following_id.to_string()));
        Ok(())
    }

    async fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<NotificationRow> = tables
            .notifications
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(rows
            .into_iter()
            .filter_map(|row| Notification::try_from(row).ok())
            .take(limit)
            .collect())
    }
}
