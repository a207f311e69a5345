//! `AssetInventory` over a mounted asset directory.
//!
//! The renderer writes each asset to `<root>/<story_id>/<key>.<ext>`; the key
//! is the file stem.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use pathweaver_core::assets::AssetInventory;
use pathweaver_core::error::DomainError;

/// Lists produced assets from the filesystem.
#[derive(Debug, Clone)]
pub struct FsAssetInventory {
    root: PathBuf,
}

impl FsAssetInventory {
    /// Creates an inventory rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn io_error(e: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("asset listing failed: {e}"))
}

#[async_trait]
impl AssetInventory for FsAssetInventory {
    async fn list_asset_keys(&self, story_id: Uuid) -> Result<HashSet<String>, DomainError> {
        let dir = self.root.join(story_id.to_string());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // Nothing rendered yet.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(io_error(&e)),
        };

        let mut keys = HashSet::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&e))? {
            let file_type = entry.file_type().await.map_err(|e| io_error(&e))?;
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !stem.is_empty() && !stem.starts_with('.') {
                keys.insert(stem.to_owned());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_file_stems_of_story_directory() {
        // Arrange
        let root = tempfile::tempdir().unwrap();
        let story_id = Uuid::new_v4();
        let node_id = Uuid::new_v4();
        let dir = root.path().join(story_id.to_string());
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(format!("{node_id}.png")), b"png").unwrap();
        std::fs::write(dir.join("banner.png"), b"png").unwrap();
        std::fs::write(dir.join("theme.mp3"), b"mp3").unwrap();
        std::fs::write(dir.join(".partial"), b"").unwrap();
        std::fs::create_dir(dir.join("thumbnails")).unwrap();
        let inventory = FsAssetInventory::new(root.path());

        // Act
        let keys = inventory.list_asset_keys(story_id).await.unwrap();

        // Assert
        let expected: HashSet<String> = [node_id.to_string(), "banner".into(), "theme".into()]
            .into_iter()
            .collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_missing_story_directory_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let inventory = FsAssetInventory::new(root.path());

        let keys = inventory.list_asset_keys(Uuid::new_v4()).await.unwrap();

        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_other_stories_are_not_listed() {
        let root = tempfile::tempdir().unwrap();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        std::fs::create_dir(root.path().join(mine.to_string())).unwrap();
        std::fs::create_dir(root.path().join(theirs.to_string())).unwrap();
        std::fs::write(root.path().join(theirs.to_string()).join("banner.png"), b"png").unwrap();
        let inventory = FsAssetInventory::new(root.path());

        let keys = inventory.list_asset_keys(mine).await.unwrap();

        assert!(keys.is_empty());
    }
}
