//! Search command implementation.

use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use indexq_core::search::{FtsIndexer, SearchHit};
use tabled::Tabled;

use super::load_config;
use super::output::print_table;
use crate::SearchArgs;

#[derive(Debug, Tabled)]
struct HitRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Content")]
    content_id: i64,
    #[tabled(rename = "Rank")]
    rank: String,
}

impl From<&SearchHit> for HitRow {
    fn from(hit: &SearchHit) -> Self {
        Self { key: hit.key.clone(), content_id: hit.content_id.get(), rank: format!("{:.3}", hit.rank) }
    }
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: &SearchArgs) -> Result<()> {
    let rc = load_config(config, profile)?;

    if !rc.index_db.exists() {
        return Err(eyre!(
            "Index not found at {}\nThe index is written by the application that runs the queue worker; check `index_db` in the active profile.",
            rc.index_db.display()
        ));
    }

    let index = FtsIndexer::open(&rc.index_db)
        .wrap_err_with(|| format!("Failed to open index {}", rc.index_db.display()))?;
    let hits = index.search(&args.query, args.limit)?;

    let rows: Vec<HitRow> = hits.iter().map(HitRow::from).collect();
    print_table(&rows, "(no results found)");
    Ok(())
}
