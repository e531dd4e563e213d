use indexq_core::config::loader::{default_config_path, ConfigLoader};
use std::path::Path;

pub fn run(config: Option<&Path>, profile: Option<&str>) {
    match ConfigLoader::load(config, profile) {
        Ok(rc) => {
            crate::logging::init(&rc);
            tracing::debug!(profile = %rc.active_profile, "doctor resolved configuration");

            println!("OK   indexq doctor");
            println!(
                "path: {}",
                config.map_or_else(
                    || default_config_path().display().to_string(),
                    |p| p.display().to_string()
                )
            );
            println!("profile: {}", rc.active_profile);
            println!("data_dir: {}", rc.data_dir.display());
            println!("queue_db: {}", rc.queue_db.display());
            println!("index_db: {}", rc.index_db.display());
            println!("queue.batch_size: {}", rc.queue.batch_size);
            println!("queue.idle_timeout_ms: {}", rc.queue.idle_timeout_ms);
            println!("queue.type_check_attempts: {}", rc.queue.type_check_attempts);
            println!("logging.level: {}", rc.logging.level);
        }
        Err(e) => {
            println!("FAIL indexq doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    }
}
