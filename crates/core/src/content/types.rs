//! Content value types exchanged with the loader and the indexer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::queue::{ChildId, ContentId, ContentTypeId, RevisionId, RowKey};

/// Field name to extracted text value.
pub type Fields = BTreeMap<String, String>;

/// Address of a content item; the revision is a hint and may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemLocator {
    pub content_id: ContentId,
    pub revision: Option<RevisionId>,
}

impl ItemLocator {
    pub fn new(content_id: ContentId) -> Self {
        Self { content_id, revision: None }
    }

    pub fn with_revision(content_id: ContentId, revision: RevisionId) -> Self {
        Self { content_id, revision: Some(revision) }
    }
}

/// Minimal description of an existing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub content_id: ContentId,
    pub revision: RevisionId,
    pub content_type_id: ContentTypeId,
}

/// Which fragments of an item to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScope {
    /// Every field, every binary and every child row.
    Full,
    /// Only the requested fragments, with binaries only for the named fields.
    Partial {
        /// `Some(binaries)` loads the parent fragment; an empty set means
        /// non-binary fields only.
        parent: Option<BTreeSet<String>>,
        rows: BTreeMap<RowKey, BTreeSet<String>>,
    },
}

impl LoadScope {
    pub fn includes_parent(&self) -> bool {
        match self {
            Self::Full => true,
            Self::Partial { parent, .. } => parent.is_some(),
        }
    }

    pub fn includes_row(&self, row: &RowKey) -> bool {
        match self {
            Self::Full => true,
            Self::Partial { rows, .. } => rows.contains_key(row),
        }
    }
}

/// Field values of one child row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRowFields {
    pub row: RowKey,
    pub fields: Fields,
}

/// Fragments returned by [`super::ContentLoader::load_item`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadedItem {
    /// Parent fields; `None` when the parent fragment was not requested.
    pub fields: Option<Fields>,
    pub children: Vec<ChildRowFields>,
}

/// Indexing-relevant state of a content type definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentTypeInfo {
    pub id: ContentTypeId,
    pub name: String,
    /// The definition is loaded and started.
    pub running: bool,
    pub visible: bool,
    pub searchable: bool,
    pub searchable_children: BTreeSet<ChildId>,
}

impl ContentTypeInfo {
    pub fn is_active(&self) -> bool {
        self.running && self.visible
    }

    pub fn allows_child(&self, child_id: ChildId) -> bool {
        self.searchable_children.contains(&child_id)
    }
}
