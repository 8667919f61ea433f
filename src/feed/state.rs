//! Feed state machine.
//!
//! `Empty -> LoadingFirstPage -> Ready <-> LoadingNextPage`, with realtime
//! prepends accepted in every phase. Only the most recently issued request may
//! land; anything older is stale and dropped.

use crate::error::AppError;
use crate::models::{
    post::{FeedPage, Post},
    user::User,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedPhase {
    #[default]
    Empty,
    LoadingFirstPage,
    Ready,
    LoadingNextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Reset,
    Append { page: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub token: u64,
    pub kind: RequestKind,
}

/// What happened to a fetch result.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied,
    Failed(AppError),
    /// A newer request was issued after this one.
    Stale,
    Released,
}

/// Read-only copy of the feed for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub posts: Vec<Post>,
    pub page: usize,
    pub has_more: bool,
    pub loading: bool,
    pub phase: FeedPhase,
    pub last_error: Option<AppError>,
    pub viewer: Option<User>,
    pub released: bool,
}

#[derive(Debug)]
pub(crate) struct FeedState {
    posts: Vec<Post>,
    page: usize,
    has_more: bool,
    // a reset has landed; pages after 0 are meaningless before that
    first_page_loaded: bool,
    phase: FeedPhase,
    next_token: u64,
    pending: Option<Ticket>,
    // realtime posts seen while a reset was in flight
    arrived_during_reset: Vec<Post>,
    last_error: Option<AppError>,
    viewer: Option<User>,
    released: bool,
    page_size: usize,
}

impl FeedState {
    pub fn new(page_size: usize) -> Self {
        Self {
            posts: Vec::new(),
            page: 0,
            has_more: true,
            first_page_loaded: false,
            phase: FeedPhase::Empty,
            next_token: 0,
            pending: None,
            arrived_during_reset: Vec::new(),
            last_error: None,
            viewer: None,
            released: false,
            page_size,
        }
    }

    fn issue(&mut self, kind: RequestKind) -> Ticket {
        self.next_token += 1;
        let ticket = Ticket {
            token: self.next_token,
            kind,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// A reset always issues and supersedes whatever is in flight.
    pub fn begin_reset(&mut self) -> Option<Ticket> {
        if self.released {
            return None;
        }
        let reset_in_flight = matches!(
            self.pending,
            Some(Ticket {
                kind: RequestKind::Reset,
                ..
            })
        );
        if !reset_in_flight {
            self.arrived_during_reset.clear();
        }
        self.phase = FeedPhase::LoadingFirstPage;
        Some(self.issue(RequestKind::Reset))
    }

    /// `None` while loading, before a first page has landed, after the last page,
    /// or once released.
    pub fn begin_append(&mut self) -> Option<Ticket> {
        if self.released
            || self.pending.is_some()
            || !self.first_page_loaded
            || self.phase != FeedPhase::Ready
            || !self.has_more
        {
            return None;
        }
        self.phase = FeedPhase::LoadingNextPage;
        let page = self.page + 1;
        Some(self.issue(RequestKind::Append { page }))
    }

    pub fn complete(&mut self, token: u64, result: Result<FeedPage, AppError>) -> Completion {
        if self.released {
            return Completion::Released;
        }
        let ticket = match self.pending {
            Some(ticket) if ticket.token == token => ticket,
            _ => return Completion::Stale,
        };
        self.pending = None;
        self.phase = FeedPhase::Ready;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.arrived_during_reset.clear();
                self.last_error = Some(e.clone());
                return Completion::Failed(e);
            }
        };

        let full = page.is_full(self.page_size);
        match ticket.kind {
            RequestKind::Reset => {
                self.posts = page.posts;
                for post in std::mem::take(&mut self.arrived_during_reset) {
                    if !self.posts.iter().any(|existing| existing.id == post.id) {
                        self.posts.insert(0, post);
                    }
                }
                self.page = 0;
                self.first_page_loaded = true;
            }
            RequestKind::Append { page: index } => {
                self.posts.extend(page.posts);
                self.page = index;
            }
        }
        self.has_more = full;
        self.last_error = None;
        Completion::Applied
    }

    /// Pure prepend. Never touches the cursor or `has_more`.
    pub fn prepend(&mut self, post: Post) -> bool {
        if self.released {
            return false;
        }
        if let Some(Ticket {
            kind: RequestKind::Reset,
            ..
        }) = self.pending
        {
            self.arrived_during_reset.push(post.clone());
        }
        self.posts.insert(0, post);
        true
    }

    /// Surfaces a failure that did not come from a fetch (e.g. subscribe).
    pub fn record_error(&mut self, error: AppError) {
        if !self.released {
            self.last_error = Some(error);
        }
    }

    pub fn set_viewer(&mut self, viewer: Option<User>) {
        if !self.released {
            self.viewer = viewer;
        }
    }

    pub fn release(&mut self) -> bool {
        let was_live = !self.released;
        self.released = true;
        self.pending = None;
        self.arrived_during_reset.clear();
        was_live
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            posts: self.posts.clone(),
            page: self.page,
            has_more: self.has_more,
            loading: self.pending.is_some(),
            phase: self.phase,
            last_error: self.last_error.clone(),
            viewer: self.viewer.clone(),
            released: self.released,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::{PostAuthor, MediaKind};
    use chrono::{TimeZone, Utc};

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            user_id: "u1".to_string(),
            media_type: MediaKind::Photo,
            media_url: String::new(),
            caption: String::new(),
            hashtags: vec![],
            region: None,
            city: None,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            fire_count: 0,
            comment_count: 0,
            author: PostAuthor::default(),
            author_fire_level: 0,
        }
    }

    fn page(index: usize, ids: &[&str]) -> FeedPage {
        FeedPage {
            index,
            posts: ids.iter().map(|id| post(id)).collect(),
        }
    }

    fn ids(state: &FeedState) -> Vec<String> {
        state.snapshot().posts.into_iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_append_requires_ready_and_more() {
        let mut state = FeedState::new(2);
        assert!(state.begin_append().is_none());

        let t = state.begin_reset().unwrap();
        assert!(state.begin_append().is_none());
        assert_eq!(state.complete(t.token, Ok(page(0, &["a", "b"]))), Completion::Applied);

        let t = state.begin_append().unwrap();
        assert_eq!(t.kind, RequestKind::Append { page: 1 });
        assert_eq!(state.snapshot().phase, FeedPhase::LoadingNextPage);
        assert_eq!(state.complete(t.token, Ok(page(1, &["c"]))), Completion::Applied);

        assert_eq!(ids(&state), vec!["a", "b", "c"]);
        assert_eq!(state.snapshot().page, 1);
        assert!(!state.snapshot().has_more);
        assert!(state.begin_append().is_none());
    }

    #[test]
    fn test_failed_reset_keeps_previous_posts() {
        let mut state = FeedState::new(2);
        let t = state.begin_reset().unwrap();
        state.complete(t.token, Ok(page(0, &["a", "b"])));

        let t = state.begin_reset().unwrap();
        let outcome = state.complete(t.token, Err(AppError::Network("down".into())));
        assert!(matches!(outcome, Completion::Failed(_)));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, FeedPhase::Ready);
        assert!(!snapshot.loading);
        assert!(snapshot.last_error.is_some());
        assert_eq!(ids(&state), vec!["a", "b"]);
    }

    #[test]
    fn test_failed_first_load_lands_in_ready_empty() {
        let mut state = FeedState::new(2);
        let t = state.begin_reset().unwrap();
        state.complete(t.token, Err(AppError::Network("down".into())));
        assert_eq!(state.snapshot().phase, FeedPhase::Ready);
        assert!(state.snapshot().posts.is_empty());
    }

    #[test]
    fn test_no_append_after_failed_first_load() {
        let mut state = FeedState::new(2);
        let t = state.begin_reset().unwrap();
        state.complete(t.token, Err(AppError::Network("down".into())));
        assert!(state.begin_append().is_none());

        let t = state.begin_reset().unwrap();
        state.complete(t.token, Ok(page(0, &["a", "b"])));
        assert_eq!(state.begin_append().unwrap().kind, RequestKind::Append { page: 1 });
    }

    #[test]
    fn test_reset_supersedes_append() {
        let mut state = FeedState::new(2);
        let t = state.begin_reset().unwrap();
        state.complete(t.token, Ok(page(0, &["a", "b"])));

        let append = state.begin_append().unwrap();
        let reset = state.begin_reset().unwrap();
        assert_eq!(state.complete(reset.token, Ok(page(0, &["x", "y"]))), Completion::Applied);
        assert_eq!(state.complete(append.token, Ok(page(1, &["c", "d"]))), Completion::Stale);
        assert_eq!(ids(&state), vec!["x", "y"]);
        assert_eq!(state.snapshot().page, 0);
    }

    #[test]
    fn test_prepend_survives_in_flight_reset() {
        let mut state = FeedState::new(3);
        let t = state.begin_reset().unwrap();
        assert!(state.prepend(post("live")));
        assert_eq!(ids(&state), vec!["live"]);

        state.complete(t.token, Ok(page(0, &["a", "b", "c"])));
        assert_eq!(ids(&state), vec!["live", "a", "b", "c"]);
        assert!(state.snapshot().has_more);
    }

    #[test]
    fn test_prepend_not_doubled_when_reset_already_has_it() {
        let mut state = FeedState::new(3);
        let t = state.begin_reset().unwrap();
        state.prepend(post("a"));
        state.complete(t.token, Ok(page(0, &["a", "b"])));
        assert_eq!(ids(&state), vec!["a", "b"]);
    }

    #[test]
    fn test_prepend_leaves_cursor_alone() {
        let mut state = FeedState::new(1);
        let t = state.begin_reset().unwrap();
        state.complete(t.token, Ok(page(0, &["a"])));
        let before = state.snapshot();

        state.prepend(post("b"));
        let after = state.snapshot();
        assert_eq!(after.page, before.page);
        assert_eq!(after.has_more, before.has_more);
        assert_eq!(after.posts[0].id, "b");
    }

    #[test]
    fn test_released_state_ignores_everything() {
        let mut state = FeedState::new(2);
        let t = state.begin_reset().unwrap();
        assert!(state.release());
        assert!(!state.release());

        assert_eq!(state.complete(t.token, Ok(page(0, &["a"]))), Completion::Released);
        assert!(!state.prepend(post("b")));
        assert!(state.begin_reset().is_none());
        assert!(state.snapshot().posts.is_empty());
    }
}
