use uuid::Uuid;
use validator::Validate;

use super::require_viewer;
use crate::config::GENERATED_CAPTION_MAX_CHARS;
use crate::error::{AppError, Result};
use crate::models::post::{MediaKind, NewPost, Post, PostDraft};
use crate::state::AppState;
use crate::utils::{
    hashtags::extract_hashtags,
    html::{clean_text, truncate_chars},
};

fn is_media_mime(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("video/")
}

/// Asks the caption collaborator for a caption suggestion.
pub async fn generate_caption(state: &AppState, bytes: &[u8], mime_type: &str) -> Result<String> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Select a photo or video first".to_string()));
    }
    if !is_media_mime(mime_type) {
        return Err(AppError::BadRequest(format!("Unsupported media type '{}'", mime_type)));
    }

    let captioner = state
        .captioner
        .as_ref()
        .ok_or(AppError::Network("Caption service is not configured".to_string()))?;

    let raw = captioner.generate_caption(bytes, mime_type).await.map_err(|e| {
        tracing::error!("Caption generation failed: {}", e);
        e
    })?;

    Ok(truncate_chars(clean_text(raw.trim()).trim(), GENERATED_CAPTION_MAX_CHARS))
}

/// Stores the media, then inserts the post.
///
/// Open feeds pick the new post up from the realtime source, not from here.
pub async fn publish(state: &AppState, draft: PostDraft) -> Result<Post> {
    let viewer = require_viewer(state).await?;
    draft.validate()?;
    if !is_media_mime(&draft.mime_type) {
        return Err(AppError::BadRequest(format!(
            "Unsupported media type '{}'",
            draft.mime_type
        )));
    }

    let path = format!("media/{}/{}.{}", viewer.id, Uuid::new_v4(), draft.extension());
    let media_url = state.storage.upload(&path, &draft.bytes).await?;

    let caption = clean_text(draft.caption.trim());
    let hashtags = extract_hashtags(&caption);
    let row = state
        .repo
        .insert_post(NewPost {
            user_id: viewer.id.clone(),
            media_type: MediaKind::from_mime(&draft.mime_type),
            media_url,
            caption,
            hashtags,
            region: draft.region.filter(|r| !r.trim().is_empty()),
            city: draft.city.filter(|c| !c.trim().is_empty()),
        })
        .await?;

    tracing::info!(post_id = %row.id, user_id = %viewer.id, "post published");
    Ok(Post::from(row))
}
