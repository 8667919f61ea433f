// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;
use zyeute::backend::{
    ChangeKind, JwtSessionStore, LocalObjectStore, MemoryRealtime, MemoryRepository, RealtimeSource,
    Repository, Subscription,
};
use zyeute::error::{AppError, Result};
use zyeute::models::{
    notification::Notification,
    post::{NewPost, PostRow},
    user::{ProfileStats, ProfileUpdate, User},
};
use zyeute::state::AppState;
use zyeute::utils::jwt::sign_jwt;

pub const SECRET: &str = "feed_test_secret";

/// `MemoryRepository` whose feed reads can be held open and made to fail.
///
/// A held fetch reads its rows first and only then waits, so the rows it
/// returns are the ones present when the call started.
#[derive(Default)]
pub struct GatedRepository {
    pub inner: MemoryRepository,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl GatedRepository {
    pub fn new(inner: MemoryRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Holds the next feed fetch until the returned sender fires (or is dropped).
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Feed fetches that have read their rows so far.
    pub fn fetch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for GatedRepository {
    async fn fetch_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        let gate = self.gates.lock().unwrap().pop_front();
        let rows = if self.failing.load(Ordering::SeqCst) {
            Err(AppError::Network("connection reset".to_string()))
        } else {
            self.inner.fetch_posts(offset, limit).await
        };
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        rows
    }

    async fn fetch_user_posts(&self, user_id: &str, offset: usize, limit: usize) -> Result<Vec<PostRow>> {
        self.inner.fetch_user_posts(user_id, offset, limit).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<PostRow> {
        self.inner.insert_post(post).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User> {
        self.inner.update_profile(id, update).await
    }

    async fn profile_stats(&self, user_id: &str) -> Result<ProfileStats> {
        self.inner.profile_stats(user_id).await
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.inner.is_following(follower_id, following_id).await
    }

    async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.inner.follow(follower_id, following_id).await
    }

    async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.inner.unfollow(follower_id, following_id).await
    }

    async fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        self.inner.list_notifications(user_id, limit).await
    }
}

/// Realtime source that is always down.
pub struct OfflineRealtime;

#[async_trait]
impl RealtimeSource for OfflineRealtime {
    async fn subscribe(&self, _table: &str, _kind: ChangeKind) -> Result<Subscription> {
        Err(AppError::Network("realtime unavailable".to_string()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<GatedRepository>,
    pub realtime: Arc<MemoryRealtime>,
    pub auth: Arc<JwtSessionStore>,
    pub storage_root: std::path::PathBuf,
}

impl TestApp {
    pub fn sign_in(&self, user_id: &str) {
        let token = sign_jwt(user_id, "authenticated", SECRET, 3600).unwrap();
        self.auth.sign_in_with_token(&token).unwrap();
    }
}

/// Wires in-memory collaborators into an `AppState` with the given page size.
pub fn spawn_app(page_size: usize) -> TestApp {
    let realtime = Arc::new(MemoryRealtime::new());
    let repo = Arc::new(GatedRepository::new(MemoryRepository::with_realtime(Arc::clone(
        &realtime,
    ))));
    let auth = Arc::new(JwtSessionStore::new(SECRET));
    let storage_root = std::env::temp_dir().join(format!("zyeute-test-{}", uuid::Uuid::new_v4()));
    let storage = LocalObjectStore::new(&storage_root, "https://cdn.zyeute.test/storage").unwrap();

    let state = AppState::new(
        repo.clone(),
        auth.clone(),
        realtime.clone(),
        Arc::new(storage),
    )
    .with_page_size(page_size);

    TestApp {
        state,
        repo,
        realtime,
        auth,
        storage_root,
    }
}

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        ..User::default()
    }
}

/// Post row created `seconds` after a fixed epoch.
pub fn post_row(id: &str, user_id: &str, seconds: i64) -> PostRow {
    PostRow {
        id: id.to_string(),
        user_id: user_id.to_string(),
        media_type: Some("photo".to_string()),
        media_url: Some(format!("https://cdn.zyeute.test/{}.jpg", id)),
        caption: Some(format!("post {}", id)),
        created_at: Some(Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()),
        ..PostRow::default()
    }
}

/// Seeds `count` posts; `p{count-1}` is the newest.
pub async fn seed_posts(repo: &GatedRepository, count: usize) {
    for i in 0..count {
        repo.inner
            .add_post(post_row(&format!("p{:02}", i), "author", i as i64))
            .await;
    }
}

/// Polls `check` until it holds, failing the test after five seconds.
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
