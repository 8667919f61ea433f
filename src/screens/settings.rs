use validator::Validate;

use super::require_viewer;
use crate::error::Result;
use crate::models::user::{ProfileUpdate, User};
use crate::state::AppState;
use crate::utils::html::clean_text;

/// The viewer's editable fields, blank where unset.
pub async fn load_settings(state: &AppState) -> Result<ProfileUpdate> {
    let viewer = require_viewer(state).await?;
    Ok(ProfileUpdate {
        display_name: viewer.display_name.unwrap_or_default(),
        bio: viewer.bio.unwrap_or_default(),
        city: viewer.city.unwrap_or_default(),
    })
}

pub async fn save_profile(state: &AppState, update: ProfileUpdate) -> Result<User> {
    let viewer = require_viewer(state).await?;
    update.validate()?;

    let update = ProfileUpdate {
        display_name: clean_text(update.display_name.trim()),
        bio: clean_text(update.bio.trim()),
        city: clean_text(update.city.trim()),
    };

    let user = state.repo.update_profile(&viewer.id, &update).await?;
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Ends the session. Session watchers observe `None`.
pub fn sign_out(state: &AppState) {
    state.auth.sign_out();
}
