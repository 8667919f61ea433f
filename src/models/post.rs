use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Public profile fields of a post's author, as joined onto feed rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Photo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// A post as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Opaque identifier, unique for the lifetime of the feed.
    pub id: String,
    pub user_id: String,
    pub media_type: MediaKind,
    pub media_url: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub region: Option<String>,
    pub city: Option<String>,

    /// Sole sort key, newest first.
    pub created_at: DateTime<Utc>,

    pub fire_count: i64,
    pub comment_count: i64,

    /// Defaults when the row came back without the author join.
    pub author: PostAuthor,
    /// The author's current fire level. 0 when the join was missing.
    pub author_fire_level: i32,
}

/// Flat row shape returned by the query collaborator and by realtime payloads.
///
/// Every joined column is optional: a row missing its author or fire join is
/// still a valid post.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub media_type: Option<String>,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub fire_count: Option<i64>,
    pub comment_count: Option<i64>,

    pub author_username: Option<String>,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub author_is_verified: Option<bool>,
    pub author_fire_level: Option<i32>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let author = match row.author_username {
            Some(username) => PostAuthor {
                id: row.user_id.clone(),
                username,
                display_name: row.author_display_name,
                avatar_url: row.author_avatar_url,
                is_verified: row.author_is_verified.unwrap_or(false),
            },
            None => PostAuthor {
                id: row.user_id.clone(),
                ..PostAuthor::default()
            },
        };

        Post {
            id: row.id,
            user_id: row.user_id,
            media_type: match row.media_type.as_deref() {
                Some("video") => MediaKind::Video,
                _ => MediaKind::Photo,
            },
            media_url: row.media_url.unwrap_or_default(),
            caption: row.caption.unwrap_or_default(),
            hashtags: row.hashtags.unwrap_or_default(),
            region: row.region,
            city: row.city,
            created_at: row.created_at.unwrap_or_else(Utc::now),
            fire_count: row.fire_count.unwrap_or(0),
            comment_count: row.comment_count.unwrap_or(0),
            author,
            author_fire_level: row.author_fire_level.unwrap_or(0),
        }
    }
}

/// One fetch worth of posts, tagged with the page index it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub index: usize,
    pub posts: Vec<Post>,
}

impl FeedPage {
    /// Only a full page may be followed by another one.
    pub fn is_full(&self, page_size: usize) -> bool {
        self.posts.len() == page_size
    }
}

/// Row to insert once the media is stored.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: String,
    pub media_type: MediaKind,
    pub media_url: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// Input collected by the upload screen.
#[derive(Debug, Clone, Validate)]
pub struct PostDraft {
    pub file_name: String,

    pub mime_type: String,

    #[validate(length(min = 1, message = "Select a photo or video first"))]
    pub bytes: Vec<u8>,

    #[validate(length(max = 2200, message = "Caption must be at most 2200 characters"))]
    pub caption: String,

    #[validate(length(max = 64))]
    pub region: Option<String>,

    #[validate(length(max = 100))]
    pub city: Option<String>,
}

impl PostDraft {
    /// Extension taken from the file name, falling back to the mime subtype.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .or_else(|| self.mime_type.split('/').nth(1))
            .unwrap_or("bin")
            .to_ascii_lowercase()
    }
}
