//! Media asset ports: rendering requests and the produced-asset inventory.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Key suffix of the story cover image.
pub const BANNER_SUFFIX: &str = "banner";

/// Key suffix of the optional story theme audio.
pub const THEME_SUFFIX: &str = "theme";

/// Which asset of a story a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetSlot {
    /// The illustration of one flattened story node.
    Node(Uuid),
    /// The cover image.
    Banner,
    /// The theme audio track.
    Theme,
}

/// Media type produced for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// A still image.
    Image,
    /// An audio track.
    Audio,
}

/// Identifies one media asset: `(story_id, node_id | "banner" | "theme")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    /// The owning story.
    pub story_id: Uuid,
    /// The asset within the story.
    pub slot: AssetSlot,
}

impl AssetKey {
    /// Key of a node illustration.
    #[must_use]
    pub fn node(story_id: Uuid, node_id: Uuid) -> Self {
        Self {
            story_id,
            slot: AssetSlot::Node(node_id),
        }
    }

    /// Key of the cover image.
    #[must_use]
    pub fn banner(story_id: Uuid) -> Self {
        Self {
            story_id,
            slot: AssetSlot::Banner,
        }
    }

    /// Key of the theme audio.
    #[must_use]
    pub fn theme(story_id: Uuid) -> Self {
        Self {
            story_id,
            slot: AssetSlot::Theme,
        }
    }

    /// The suffix reported by an `AssetInventory` once this asset exists.
    #[must_use]
    pub fn suffix(&self) -> String {
        match self.slot {
            AssetSlot::Node(node_id) => node_id.to_string(),
            AssetSlot::Banner => BANNER_SUFFIX.to_owned(),
            AssetSlot::Theme => THEME_SUFFIX.to_owned(),
        }
    }

    /// Media type rendered for this key.
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        match self.slot {
            AssetSlot::Node(_) | AssetSlot::Banner => AssetKind::Image,
            AssetSlot::Theme => AssetKind::Audio,
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.story_id, self.suffix())
    }
}

/// A request for the external renderer to produce one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    /// Where the produced asset will be stored.
    pub key: AssetKey,
    /// Description of the image or audio to render.
    pub prompt: String,
}

/// External media renderer. Requests are accepted asynchronously; the
/// rendered asset shows up in the `AssetInventory` some time later.
#[async_trait]
pub trait AssetRenderer: Send + Sync {
    /// Submit a single render request. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the request was not accepted.
    async fn render(&self, request: &AssetRequest) -> Result<(), DomainError>;
}

/// Read-only view of the assets already produced for a story.
#[async_trait]
pub trait AssetInventory: Send + Sync {
    /// Returns the key suffixes currently present for `story_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be listed.
    async fn list_asset_keys(&self, story_id: Uuid) -> Result<HashSet<String>, DomainError>;
}
