//! Decides whether events for a content type may enter the index.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::content::ContentTypeCatalog;

use super::types::{ChildId, ContentTypeId};

/// Indexability check with bounded retries.
///
/// Content type definitions can briefly disappear while an editor hot-reloads,
/// so a missing or stopped definition is looked up again before the type is
/// declared not indexable. A definition that is active but not searchable is
/// final on the first lookup.
pub struct IndexabilityCheck {
    catalog: Arc<dyn ContentTypeCatalog>,
    attempts: u32,
    retry_wait: Duration,
}

impl IndexabilityCheck {
    pub fn new(catalog: Arc<dyn ContentTypeCatalog>, attempts: u32, retry_wait: Duration) -> Self {
        Self { catalog, attempts: attempts.max(1), retry_wait }
    }

    pub fn is_indexable(&self, content_type_id: ContentTypeId, child_id: Option<ChildId>) -> bool {
        if content_type_id == ContentTypeId::FOLDER {
            return true;
        }

        for attempt in 1..=self.attempts {
            if let Some(info) = self.catalog.lookup(content_type_id)
                && info.is_active()
            {
                return info.searchable && child_id.is_none_or(|c| info.allows_child(c));
            }
            if attempt < self.attempts {
                tracing::debug!(
                    "Content type {} not active (attempt {}/{}), retrying",
                    content_type_id,
                    attempt,
                    self.attempts
                );
                thread::sleep(self.retry_wait);
            }
        }

        false
    }
}
