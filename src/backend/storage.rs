use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use url::Url;

use crate::error::{AppError, Result};

/// Storage collaborator: given bytes and a path, return a durable public URL or fail.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String>;
}

/// Filesystem bucket served under a public base URL.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: Url,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Result<Self> {
        let mut public_base = Url::parse(public_base)
            .map_err(|e| AppError::BadRequest(format!("invalid storage URL: {}", e)))?;
        // join() drops the last segment unless the base ends with '/'
        if !public_base.path().ends_with('/') {
            let path = format!("{}/", public_base.path());
            public_base.set_path(&path);
        }
        Ok(Self {
            root: root.into(),
            public_base,
        })
    }
}

/// Rejects absolute paths and any `..` component.
fn checked_relative(path: &str) -> Result<&Path> {
    let relative = Path::new(path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(relative)
    } else {
        Err(AppError::BadRequest(format!("invalid object path '{}'", path)))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String> {
        let relative = checked_relative(path)?;
        let target = self.root.join(relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await.map_err(|e| {
            tracing::error!("Failed to store object {}: {:?}", path, e);
            AppError::Network(e.to_string())
        })?;

        let url = self
            .public_base
            .join(path)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tracing::debug!(path, size = bytes.len(), "object stored");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal() {
        assert!(checked_relative("../etc/passwd").is_err());
        assert!(checked_relative("/abs/file").is_err());
        assert!(checked_relative("").is_err());
        assert!(checked_relative("media/u1/a.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_upload_writes_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("zyeute-store-{}", uuid::Uuid::new_v4()));
        let store = LocalObjectStore::new(&root, "https://cdn.example.com/storage").unwrap();

        let url = store.upload("media/u1/a.jpg", b"jpeg").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/storage/media/u1/a.jpg");
        assert_eq!(std::fs::read(root.join("media/u1/a.jpg")).unwrap(), b"jpeg");

        std::fs::remove_dir_all(&root).ok();
    }
}
