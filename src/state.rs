use std::sync::Arc;

use crate::backend::{AuthProvider, CaptionGenerator, ObjectStore, RealtimeSource, Repository};
use crate::config::FEED_PAGE_SIZE;

/// Explicit handles to every hosted collaborator.
///
/// Screens and the feed receive this instead of reaching for ambient clients.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub auth: Arc<dyn AuthProvider>,
    pub realtime: Arc<dyn RealtimeSource>,
    pub storage: Arc<dyn ObjectStore>,
    /// `None` when no caption API key is configured.
    pub captioner: Option<Arc<dyn CaptionGenerator>>,
    pub page_size: usize,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        auth: Arc<dyn AuthProvider>,
        realtime: Arc<dyn RealtimeSource>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            repo,
            auth,
            realtime,
            storage,
            captioner: None,
            page_size: FEED_PAGE_SIZE,
        }
    }

    pub fn with_captioner(mut self, captioner: Arc<dyn CaptionGenerator>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}
