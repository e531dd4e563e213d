//! Content repository collaborators: item loading and content type metadata.
//!
//! The queue never reads content directly. It asks a [`ContentLoader`] for
//! field values and a [`ContentTypeCatalog`] for whether a type may be indexed.

mod types;

pub use types::{
    ChildRowFields, ContentTypeInfo, Fields, ItemLocator, ItemSummary, LoadScope,
    LoadedItem,
};

use thiserror::Error;

use crate::queue::{ContentId, ContentTypeId, RevisionId};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Content item {0} not found")]
    NotFound(ContentId),

    #[error("Content repository unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to load content item {content_id}: {reason}")]
    Load { content_id: ContentId, reason: String },
}

/// Loads current field values for content items.
pub trait ContentLoader: Send + Sync {
    /// Current revision of an item, or `None` if the item record is gone.
    fn current_revision(
        &self,
        content_id: ContentId,
    ) -> Result<Option<RevisionId>, LoaderError>;

    /// Component summary used to validate explicit reindex requests.
    fn load_summary(
        &self,
        locator: &ItemLocator,
    ) -> Result<Option<ItemSummary>, LoaderError>;

    /// Metadata fields (created/modified and similar) that are not part of
    /// the item's ordinary field set.
    fn load_system_fields(&self, content_id: ContentId) -> Result<Fields, LoaderError>;

    /// Load the fragments selected by `scope`.
    fn load_item(
        &self,
        locator: &ItemLocator,
        scope: &LoadScope,
    ) -> Result<Option<LoadedItem>, LoaderError>;

    /// Every live item of a content type.
    fn list_items(
        &self,
        content_type_id: ContentTypeId,
    ) -> Result<Vec<ItemLocator>, LoaderError>;
}

/// Source of content type definitions.
pub trait ContentTypeCatalog: Send + Sync {
    /// Current definition, or `None` if the type is unknown or mid-restart.
    fn lookup(&self, content_type_id: ContentTypeId) -> Option<ContentTypeInfo>;
}
