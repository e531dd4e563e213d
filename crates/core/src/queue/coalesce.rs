//! Reduction of one content item's queued events into a single effective
//! index operation.

use std::collections::{BTreeMap, BTreeSet};

use super::types::{ActionType, QueueEvent, RevisionId, RowKey};

/// The coalesced result of one content identity's queued events.
///
/// When `delete_parent` or `reindex` is set the whole item is the unit of work
/// and the per-field and per-row sets carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveOperation {
    pub delete_parent: bool,
    pub reindex: bool,
    /// Changed parent binary fields. `Some(empty)` means non-binary fields only;
    /// `None` means no parent-level change at all.
    pub parent_update: Option<BTreeSet<String>>,
    pub child_deletes: BTreeSet<RowKey>,
    pub child_updates: BTreeMap<RowKey, BTreeSet<String>>,
}

impl EffectiveOperation {
    /// True when the whole item must be removed or rebuilt.
    pub fn is_whole_item(&self) -> bool {
        self.delete_parent || self.reindex
    }

    /// True when a fragment must be loaded and submitted to the indexer.
    pub fn needs_load(&self) -> bool {
        self.parent_update.is_some() || !self.child_updates.is_empty()
    }
}

/// Coalesced operation plus the highest revision seen in the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coalesced {
    pub operation: EffectiveOperation,
    pub revision: Option<RevisionId>,
}

/// Reduce an ordered group of events sharing one content id.
///
/// Revisions must already be resolved: an event carrying
/// [`RevisionId::MISSING`] means the item record is gone and forces a parent
/// delete. A child-row delete is terminal for that row within the group.
pub fn coalesce<'a, I>(events: I) -> Coalesced
where
    I: IntoIterator<Item = &'a QueueEvent>,
{
    let mut op = EffectiveOperation::default();
    let mut revision: Option<RevisionId> = None;

    for ev in events {
        if let Some(rev) = ev.revision_id {
            if rev.is_missing() {
                op.delete_parent = true;
            } else {
                revision = Some(revision.map_or(rev, |cur| cur.max(rev)));
            }
        }

        match ev.row {
            None => match ev.action {
                ActionType::Delete => op.delete_parent = true,
                ActionType::Reindex => op.reindex = true,
                ActionType::Insert | ActionType::Update => {
                    op.parent_update
                        .get_or_insert_with(BTreeSet::new)
                        .extend(ev.binary_fields.iter().cloned());
                }
            },
            Some(row) => {
                if ev.action == ActionType::Delete {
                    op.child_updates.remove(&row);
                    op.child_deletes.insert(row);
                } else if !op.child_deletes.contains(&row) {
                    op.child_updates
                        .entry(row)
                        .or_default()
                        .extend(ev.binary_fields.iter().cloned());
                }
            }
        }
    }

    if op.delete_parent {
        op.reindex = false;
    }

    Coalesced { operation: op, revision }
}
