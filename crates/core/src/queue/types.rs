//! Queue data types: identifiers, change events and persisted rows.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority given to ordinary content edits.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Priority given to explicit reindex requests. Lower values are more urgent.
pub const REINDEX_PRIORITY: i32 = 9;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }
    };
}

id_type!(
    /// Durable cursor assigned by the queue store on insert.
    QueueId
);
id_type!(
    /// Identity of a content item.
    ContentId
);
id_type!(
    /// Revision of a content item.
    RevisionId
);
id_type!(
    /// Content type (schema) governing an item.
    ContentTypeId
);
id_type!(
    /// Complex child (repeating child table) within a content type.
    ChildId
);
id_type!(
    /// Row within a complex child table.
    RowId
);

impl RevisionId {
    /// Revision reported for items whose record no longer exists.
    pub const MISSING: RevisionId = RevisionId(-1);

    pub fn is_missing(self) -> bool {
        self == Self::MISSING
    }
}

impl ContentTypeId {
    /// Synthetic folder type; always indexable.
    pub const FOLDER: ContentTypeId = ContentTypeId(101);
}

/// Kind of change carried by a queue event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Insert,
    Update,
    Delete,
    /// Explicit request to rebuild the item's index entries. Parent-level only.
    Reindex,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Reindex => "reindex",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "reindex" => Some(Self::Reindex),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A child-row coordinate within one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub child_id: ChildId,
    pub row_id: RowId,
}

impl RowKey {
    pub fn new(child_id: i64, row_id: i64) -> Self {
        Self { child_id: ChildId(child_id), row_id: RowId(row_id) }
    }
}

/// Address of one index entry: either an item's parent fragment or one of
/// its child rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identity {
    Parent { content_id: ContentId },
    ChildRow { content_id: ContentId, child_id: ChildId, row_id: RowId },
}

impl Identity {
    pub fn parent(content_id: ContentId) -> Self {
        Self::Parent { content_id }
    }

    pub fn child_row(content_id: ContentId, row: RowKey) -> Self {
        Self::ChildRow { content_id, child_id: row.child_id, row_id: row.row_id }
    }

    pub fn content_id(&self) -> ContentId {
        match self {
            Self::Parent { content_id } | Self::ChildRow { content_id, .. } => *content_id,
        }
    }

    /// Stable string form used as the index document key.
    pub fn key(&self) -> String {
        match self {
            Self::Parent { content_id } => content_id.to_string(),
            Self::ChildRow { content_id, child_id, row_id } => {
                format!("{content_id}:{child_id}:{row_id}")
            }
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A change event as submitted by a producer, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub content_id: ContentId,
    /// `None` when the revision is unknown at enqueue time; resolved when processed.
    pub revision_id: Option<RevisionId>,
    pub content_type_id: ContentTypeId,
    /// Present only for complex-child-row events.
    pub row: Option<RowKey>,
    pub action: ActionType,
    /// Names of binary fields whose content changed.
    pub binary_fields: BTreeSet<String>,
    pub priority: i32,
    pub requires_commit: bool,
}

impl QueueEvent {
    /// Parent-level event at the default priority.
    pub fn new(content_id: i64, content_type_id: i64, action: ActionType) -> Self {
        Self {
            content_id: ContentId(content_id),
            revision_id: None,
            content_type_id: ContentTypeId(content_type_id),
            row: None,
            action,
            binary_fields: BTreeSet::new(),
            priority: DEFAULT_PRIORITY,
            requires_commit: true,
        }
    }

    pub fn with_revision(mut self, revision_id: i64) -> Self {
        self.revision_id = Some(RevisionId(revision_id));
        self
    }

    /// Turn this into a child-row event. Ids ≤ 0 mark a parent-level event.
    pub fn with_child_row(mut self, child_id: i64, row_id: i64) -> Self {
        self.row = (child_id > 0 && row_id > 0).then(|| RowKey::new(child_id, row_id));
        self
    }

    pub fn with_binary_field(mut self, field: impl Into<String>) -> Self {
        self.binary_fields.insert(field.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requires_commit(mut self, requires_commit: bool) -> Self {
        self.requires_commit = requires_commit;
        self
    }

    pub fn is_child_event(&self) -> bool {
        self.row.is_some()
    }
}

/// One persisted unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub queue_id: QueueId,
    pub event: QueueEvent,
    pub queued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn content_id(&self) -> ContentId {
        self.event.content_id
    }

    pub fn content_type_id(&self) -> ContentTypeId {
        self.event.content_type_id
    }
}

/// Operational state of the queue worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    ShuttingDown,
    Stopped,
    Paused,
    Running,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an explicit single-item reindex request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexItemResult {
    Queued,
    NotFound,
    NotIndexable,
}
