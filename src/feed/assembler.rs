use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::fetcher::PageFetcher;
use super::state::{Completion, FeedSnapshot, FeedState, RequestKind};
use super::viewer::ViewerLookup;
use crate::backend::{ChangeKind, Session, Subscription};
use crate::error::Result;
use crate::models::post::Post;
use crate::state::AppState;

/// Table whose inserts are merged into the feed.
pub const POSTS_TABLE: &str = "posts";

/// Result of a `load`/`load_more` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// Guard tripped: already loading, no more pages, or released. Nothing was fetched.
    Skipped,
    /// Fetched, but a newer request or a release made the result obsolete.
    Discarded,
}

struct Inner {
    state: Mutex<FeedState>,
    fetcher: PageFetcher,
    listener: Mutex<Option<JoinHandle<()>>>,
    session_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for slot in [&mut self.listener, &mut self.session_watcher] {
            if let Some(handle) = slot.get_mut().take() {
                handle.abort();
            }
        }
    }
}

/// Owns one viewer's feed: paginated history plus live inserts.
///
/// All mutations go through a single lock, so resets, appends and realtime
/// prepends are applied atomically and in issue order. Cloning yields another
/// handle to the same feed.
#[derive(Clone)]
pub struct FeedAssembler {
    inner: Arc<Inner>,
}

impl FeedAssembler {
    /// A feed without a realtime source.
    pub fn new(fetcher: PageFetcher) -> Self {
        let page_size = fetcher.page_size();
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(FeedState::new(page_size)),
                fetcher,
                listener: Mutex::new(None),
                session_watcher: Mutex::new(None),
            }),
        }
    }

    /// Builds the feed from the app's collaborators and subscribes to post inserts.
    ///
    /// A failed subscription is a soft failure: the feed still paginates and
    /// `last_error` reports the problem.
    pub async fn start(app: &AppState) -> Self {
        let feed = Self::new(PageFetcher::new(Arc::clone(&app.repo), app.page_size));

        match app.realtime.subscribe(POSTS_TABLE, ChangeKind::Created).await {
            Ok(subscription) => feed.attach(subscription).await,
            Err(e) => {
                tracing::warn!("feed starting without realtime: {}", e);
                feed.inner.state.lock().await.record_error(e);
            }
        }
        feed
    }

    /// Spawns the listener that prepends every row the subscription delivers.
    /// Replaces (and stops) any previous listener.
    pub async fn attach(&self, mut subscription: Subscription) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let topic = subscription.topic().to_string();

        let handle = tokio::spawn(async move {
            while let Some(row) = subscription.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                let applied = inner.state.lock().await.prepend(Post::from(row));
                if !applied {
                    break;
                }
            }
            tracing::debug!(topic = %topic, "feed listener stopped");
        });

        let previous = self.inner.listener.lock().await.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Resolves the viewer and records it for personalization.
    pub async fn resolve_viewer(&self, lookup: &ViewerLookup) {
        let viewer = lookup.resolve().await;
        self.inner.state.lock().await.set_viewer(viewer);
    }

    /// Re-resolves the viewer and reloads from page 0 on every session transition,
    /// so nothing fetched for a previous viewer stays visible.
    pub async fn watch_session(&self, lookup: ViewerLookup, mut sessions: watch::Receiver<Option<Session>>) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            while sessions.changed().await.is_ok() {
                let session = sessions.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else { break };
                let feed = FeedAssembler { inner };

                let viewer = match &session {
                    Some(session) => lookup.resolve_session(session).await,
                    None => None,
                };
                tracing::info!(signed_in = viewer.is_some(), "session changed, reloading feed");
                feed.inner.state.lock().await.set_viewer(viewer);

                match feed.load().await {
                    Ok(LoadOutcome::Skipped) => break,
                    Ok(_) => {}
                    Err(e) => tracing::warn!("reload after session change failed: {}", e),
                }
            }
        });

        let previous = self.inner.session_watcher.lock().await.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// load(0): fetch the first page and replace the whole visible sequence with it.
    ///
    /// Always issues, superseding anything in flight.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let ticket = match self.inner.state.lock().await.begin_reset() {
            Some(ticket) => ticket,
            None => return Ok(LoadOutcome::Skipped),
        };
        self.run(ticket.token, 0).await
    }

    /// Fetches the next page and appends it. No-op while loading or after the last page.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let ticket = match self.inner.state.lock().await.begin_append() {
            Some(ticket) => ticket,
            None => return Ok(LoadOutcome::Skipped),
        };
        let page = match ticket.kind {
            RequestKind::Append { page } => page,
            RequestKind::Reset => 0,
        };
        self.run(ticket.token, page).await
    }

    async fn run(&self, token: u64, page: usize) -> Result<LoadOutcome> {
        let result = self.inner.fetcher.fetch_page(page).await;
        let completion = self.inner.state.lock().await.complete(token, result);

        match completion {
            Completion::Applied => {
                tracing::debug!(page, token, "page applied");
                Ok(LoadOutcome::Applied)
            }
            Completion::Failed(e) => {
                tracing::warn!(page, token, "page load failed: {}", e);
                Err(e)
            }
            Completion::Stale => {
                tracing::debug!(page, token, "stale page discarded");
                Ok(LoadOutcome::Discarded)
            }
            Completion::Released => Ok(LoadOutcome::Discarded),
        }
    }

    /// Prepends a realtime-delivered post at index 0. Returns false once released.
    pub async fn on_post_inserted(&self, post: Post) -> bool {
        self.inner.state.lock().await.prepend(post)
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    /// Tears the feed down: stops the background tasks, releases the subscription and
    /// makes every later result or event a no-op. Idempotent.
    pub async fn release(&self) {
        let was_live = self.inner.state.lock().await.release();
        if let Some(handle) = self.inner.listener.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.inner.session_watcher.lock().await.take() {
            handle.abort();
        }
        if was_live {
            tracing::info!("feed released");
        }
    }
}
