use std::cmp::Ordering;
use std::sync::Arc;

use crate::backend::Repository;
use crate::error::{AppError, Result};
use crate::models::post::{FeedPage, Post};

/// Total feed order: newest first, identifier descending on equal timestamps.
pub fn feed_order(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Fetches fixed-size offset windows of the global post order.
///
/// Page `n` covers rows `[n * page_size, (n + 1) * page_size)`. Inserts or
/// deletes ahead of the window between two calls shift it, so consecutive
/// pages can skip or repeat rows.
#[derive(Clone)]
pub struct PageFetcher {
    repo: Arc<dyn Repository>,
    page_size: usize,
}

impl PageFetcher {
    pub fn new(repo: Arc<dyn Repository>, page_size: usize) -> Self {
        Self {
            repo,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn fetch_page(&self, index: usize) -> Result<FeedPage> {
        let offset = index
            .checked_mul(self.page_size)
            .ok_or_else(|| AppError::BadRequest(format!("page index {} out of range", index)))?;

        let rows = self.repo.fetch_posts(offset, self.page_size).await?;
        let posts: Vec<Post> = rows.into_iter().map(Post::from).collect();

        if !posts.is_sorted_by(|a, b| feed_order(a, b) != Ordering::Greater) {
            tracing::warn!(page = index, "backend returned an unordered page");
        }
        tracing::debug!(page = index, rows = posts.len(), "page fetched");

        Ok(FeedPage { index, posts })
    }
}
