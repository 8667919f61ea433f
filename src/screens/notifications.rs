use crate::error::Result;
use crate::feed::ViewerLookup;
use crate::models::notification::Notification;
use crate::state::AppState;

/// The viewer's notifications, newest first. Signed out means an empty list.
pub async fn list_notifications(state: &AppState, limit: usize) -> Result<Vec<Notification>> {
    let Some(viewer) = ViewerLookup::from_state(state).resolve().await else {
        return Ok(Vec::new());
    };
    state.repo.list_notifications(&viewer.id, limit).await
}
