use std::sync::Arc;

use crate::backend::{AuthProvider, Repository, Session};
use crate::models::user::User;
use crate::state::AppState;

/// Resolves the authenticated viewer's user record.
///
/// Every failure degrades to `None` (unauthenticated view).
#[derive(Clone)]
pub struct ViewerLookup {
    auth: Arc<dyn AuthProvider>,
    repo: Arc<dyn Repository>,
}

impl ViewerLookup {
    pub fn new(auth: Arc<dyn AuthProvider>, repo: Arc<dyn Repository>) -> Self {
        Self { auth, repo }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(Arc::clone(&state.auth), Arc::clone(&state.repo))
    }

    /// Viewer for the current session, if any.
    pub async fn resolve(&self) -> Option<User> {
        let session = self.auth.current_session()?;
        self.resolve_session(&session).await
    }

    pub async fn resolve_session(&self, session: &Session) -> Option<User> {
        if session.is_expired() {
            return None;
        }

        match self.repo.get_user(&session.user_id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!(user_id = %session.user_id, "session has no user record");
                None
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, "viewer lookup failed: {}", e);
                None
            }
        }
    }
}
