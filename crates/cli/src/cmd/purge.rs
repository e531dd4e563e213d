//! Purge command implementation.

use std::path::Path;

use color_eyre::eyre::Result;
use indexq_core::queue::{ContentId, ContentTypeId, QueueStore};
use tracing::info;

use super::{load_config, open_queue_store};
use crate::PurgeArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &PurgeArgs) -> Result<()> {
    let rc = load_config(config, profile)?;
    let store = open_queue_store(&rc)?;

    let removed = if let Some(id) = args.content_id {
        store.delete_by_content_id(ContentId::from(id))?
    } else if let Some(id) = args.content_type {
        store.delete_by_content_type_id(ContentTypeId::from(id))?
    } else {
        store.delete_all()?
    };

    info!(removed, "purged pending queue rows");
    println!("removed {removed} pending row(s)");
    Ok(())
}
