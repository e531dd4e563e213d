//! Status command implementation.

use std::path::Path;

use color_eyre::eyre::Result;
use indexq_core::queue::QueueStore;
use serde::Serialize;
use tabled::Tabled;

use super::output::{print_json, print_table};
use super::{load_config, open_queue_store};
use crate::StatusArgs;

#[derive(Debug, Serialize)]
struct StatusOutput {
    profile: String,
    queue_db: String,
    pending: u64,
    by_content_type: Vec<TypeCountRow>,
}

#[derive(Debug, Serialize, Tabled)]
struct TypeCountRow {
    #[tabled(rename = "Content type")]
    content_type_id: i64,
    #[tabled(rename = "Pending")]
    pending: u64,
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &StatusArgs) -> Result<()> {
    let rc = load_config(config, profile)?;
    let store = open_queue_store(&rc)?;

    let pending = store.count()?;
    let by_content_type = store
        .pending_by_content_type()?
        .into_iter()
        .map(|(content_type_id, pending)| TypeCountRow {
            content_type_id: content_type_id.get(),
            pending,
        })
        .collect();

    let out = StatusOutput {
        profile: rc.active_profile.clone(),
        queue_db: rc.queue_db.display().to_string(),
        pending,
        by_content_type,
    };

    if args.json {
        return print_json(&out);
    }

    println!("profile: {}", out.profile);
    println!("queue_db: {}", out.queue_db);
    println!("pending: {}", out.pending);
    if !out.by_content_type.is_empty() {
        println!();
        print_table(&out.by_content_type, "");
    }
    Ok(())
}
