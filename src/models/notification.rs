use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::post::PostAuthor;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Fire,
    Comment,
    Follow,
    Gift,
    Mention,
}

impl NotificationKind {
    /// Verb shown after the actor's name.
    pub fn verb(&self) -> &'static str {
        match self {
            NotificationKind::Fire => "a enflammé ton post",
            NotificationKind::Comment => "a commenté ton post",
            NotificationKind::Follow => "a commencé à te suivre",
            NotificationKind::Gift => "t'a envoyé un cadeau",
            NotificationKind::Mention => "t'a mentionné",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fire" => Ok(NotificationKind::Fire),
            "comment" => Ok(NotificationKind::Comment),
            "follow" => Ok(NotificationKind::Follow),
            "gift" => Ok(NotificationKind::Gift),
            "mention" => Ok(NotificationKind::Mention),
            other => Err(AppError::BadRequest(format!("unknown notification type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub actor: Option<PostAuthor>,
    pub post_id: Option<String>,
    /// Thumbnail of the post the notification is about.
    pub post_media_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Where tapping the notification leads: the post, else the actor's profile.
    pub fn target(&self) -> Option<String> {
        match (&self.post_id, &self.actor) {
            (Some(post_id), _) => Some(format!("/p/{}", post_id)),
            (None, Some(actor)) => Some(format!("/profile/{}", actor.username)),
            (None, None) => None,
        }
    }
}

/// Flat 'notifications' row with the actor and post joined.
#[derive(Debug, Clone, Default, FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub kind: String,
    pub actor_id: Option<String>,
    pub actor_username: Option<String>,
    pub actor_display_name: Option<String>,
    pub actor_avatar_url: Option<String>,
    pub actor_is_verified: Option<bool>,
    pub post_id: Option<String>,
    pub post_media_url: Option<String>,
    pub is_read: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse::<NotificationKind>()?;
        let actor = match (row.actor_id, row.actor_username) {
            (Some(id), Some(username)) => Some(PostAuthor {
                id,
                username,
                display_name: row.actor_display_name,
                avatar_url: row.actor_avatar_url,
                is_verified: row.actor_is_verified.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(Notification {
            id: row.id,
            kind,
            actor,
            post_id: row.post_id,
            post_media_url: row.post_media_url,
            is_read: row.is_read.unwrap_or(false),
            created_at: row.created_at.unwrap_or_else(Utc::now),
        })
    }
}
