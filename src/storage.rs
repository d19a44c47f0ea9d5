use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ImageConfig;
use crate::errors::Error;

/// Directory holding uploaded image files, addressed by stored file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(config.directory.clone())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored name. Names that could leave the directory are rejected.
    pub fn path_for(&self, file_name: &str) -> Result<PathBuf, Error> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name == "."
            || file_name.contains("..")
        {
            return Err(Error::InvalidFileName(file_name.to_string()));
        }
        Ok(self.root.join(file_name))
    }

    /// Write `bytes` under a fresh unique name and return that name
    pub async fn store(&self, extension: &str, bytes: &[u8]) -> Result<String, Error> {
        let extension = extension.trim_start_matches('.');
        let file_name = if extension.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            format!("{}.{extension}", Uuid::new_v4().simple())
        };
        let path = self.path_for(&file_name)?;

        if !fs::try_exists(&self.root).await? {
            fs::create_dir_all(&self.root).await?;
        }
        fs::write(&path, bytes).await?;

        info!(path = %path.display(), size = bytes.len(), "Stored image");
        Ok(file_name)
    }

    pub async fn exists(&self, file_name: &str) -> bool {
        match self.path_for(file_name) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Delete a stored file. Failures are logged and reported as false.
    pub async fn remove(&self, file_name: &str) -> bool {
        let path = match self.path_for(file_name) {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "Not removing image");
                return false;
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed image");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not remove image");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ImageStore {
        ImageStore::new(std::env::temp_dir().join(format!("rowcrate-store-{}", Uuid::new_v4())))
    }

    #[test]
    fn test_path_for_rejects_escaping_names() {
        let store = ImageStore::new("/srv/images");
        assert_eq!(
            store.path_for("a1b2.png").unwrap(),
            PathBuf::from("/srv/images/a1b2.png")
        );
        for bad in ["", ".", "../etc/passwd", "nested/file.png", "win\\file.png", "a..b"] {
            assert!(
                matches!(store.path_for(bad), Err(Error::InvalidFileName(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn test_store_then_remove() {
        let store = temp_store();
        let name = store.store(".png", b"png bytes").await.unwrap();
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 32 + 4);
        assert!(store.exists(&name).await);

        assert!(store.remove(&name).await);
        assert!(!store.exists(&name).await);
        // Second removal is a logged no-op
        assert!(!store.remove(&name).await);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_store_generates_distinct_names() {
        let store = temp_store();
        let first = store.store("jpg", b"1").await.unwrap();
        let second = store.store("jpg", b"2").await.unwrap();
        assert_ne!(first, second);

        let _ = std::fs::remove_dir_all(store.root());
    }
}
