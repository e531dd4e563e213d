//! List command implementation.

use std::path::Path;

use color_eyre::eyre::Result;
use indexq_core::queue::{Identity, QueueItem};
use tabled::Tabled;

use super::output::{print_json, print_table};
use super::{load_config, open_queue_store};
use crate::ListArgs;

#[derive(Debug, Tabled)]
struct ListRow {
    #[tabled(rename = "Queue ID")]
    queue_id: i64,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Type")]
    content_type_id: i64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Revision")]
    revision: String,
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "Queued")]
    queued_at: String,
}

impl From<&QueueItem> for ListRow {
    fn from(item: &QueueItem) -> Self {
        let event = &item.event;
        let target = match event.row {
            Some(row) => Identity::child_row(event.content_id, row),
            None => Identity::parent(event.content_id),
        };
        Self {
            queue_id: item.queue_id.get(),
            target: target.key(),
            content_type_id: event.content_type_id.get(),
            action: event.action.to_string(),
            revision: event.revision_id.map_or_else(|| "-".to_string(), |r| r.to_string()),
            priority: event.priority,
            queued_at: item.queued_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &ListArgs) -> Result<()> {
    let rc = load_config(config, profile)?;
    let store = open_queue_store(&rc)?;
    let items = store.peek(args.limit)?;

    if args.json {
        return print_json(&items);
    }

    let rows: Vec<ListRow> = items.iter().map(ListRow::from).collect();
    print_table(&rows, "(queue is empty)");
    Ok(())
}
