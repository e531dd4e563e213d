pub mod doctor;
pub mod list;
pub mod output;
pub mod purge;
pub mod search;
pub mod status;

use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use indexq_core::config::loader::ConfigLoader;
use indexq_core::config::types::ResolvedConfig;
use indexq_core::queue::SqliteQueueStore;
use tracing::debug;

/// Load configuration and install logging; every command except `doctor` starts here.
pub(crate) fn load_config(config: Option<&Path>, profile: Option<&str>) -> Result<ResolvedConfig> {
    let rc = ConfigLoader::load(config, profile).map_err(|e| {
        eyre!("Configuration error: {e}\nRun 'indexq doctor' to diagnose.")
    })?;
    crate::logging::init(&rc);
    debug!(profile = %rc.active_profile, "configuration loaded");
    Ok(rc)
}

pub(crate) fn open_queue_store(rc: &ResolvedConfig) -> Result<SqliteQueueStore> {
    if let Some(parent) = rc.queue_db.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = SqliteQueueStore::open(&rc.queue_db).wrap_err_with(|| {
        format!("Failed to open queue database {}", rc.queue_db.display())
    })?;
    debug!(path = %rc.queue_db.display(), "opened queue database");
    Ok(store)
}
