//! Screen-level operations outside the feed. Each takes the explicit
//! `AppState` handles.

pub mod notifications;
pub mod profile;
pub mod settings;
pub mod upload;
pub mod voice;

use crate::error::{AppError, Result};
use crate::feed::ViewerLookup;
use crate::models::user::User;
use crate::state::AppState;

/// The signed-in user, or `AuthError` for operations that need one.
pub(crate) async fn require_viewer(state: &AppState) -> Result<User> {
    ViewerLookup::from_state(state)
        .resolve()
        .await
        .ok_or(AppError::AuthError("Sign in required".to_string()))
}
