use indexq_core::config::loader::ConfigLoader;
use indexq_core::config::types::QueueConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_file(path: &PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn load_default_profile_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
data_dir = "/tmp/indexq"
index_db = "{{data_dir}}/search/index.db"

[queue]
batch_size = 25
idle_timeout_ms = 2000
"#;

    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), None).expect("should load");
    assert_eq!(rc.active_profile, "default");
    assert_eq!(rc.data_dir.display().to_string(), "/tmp/indexq");
    assert_eq!(rc.queue_db.display().to_string(), "/tmp/indexq/queue.db");
    assert!(rc.index_db.ends_with("search/index.db"));
    assert_eq!(rc.queue.batch_size, 25);
    assert_eq!(rc.queue.idle_timeout_ms, 2000);
    assert_eq!(rc.queue.type_check_attempts, 5);
    assert_eq!(rc.logging.level, "info");
}

#[test]
fn load_with_profile_override_ok() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("indexq/config.toml");
    let toml = r#"
version = 1
profile = "default"

[profiles.default]
data_dir = "/tmp/def"

[profiles.work]
data_dir = "/tmp/work"
queue_db = "/var/lib/indexq/work-queue.db"
"#;
    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), Some("work")).expect("should load");
    assert_eq!(rc.active_profile, "work");
    assert_eq!(rc.data_dir.display().to_string(), "/tmp/work");
    assert_eq!(rc.queue_db.display().to_string(), "/var/lib/indexq/work-queue.db");
    assert_eq!(rc.queue, QueueConfig::default());
}

#[test]
fn logging_file_expands_data_dir() {
    let tmp = tempdir().unwrap();
    let cfg_path = tmp.path().join("config.toml");
    let toml = r#"
version = 1

[profiles.default]
data_dir = "/tmp/indexq"

[logging]
level = "debug"
file = "{{data_dir}}/indexq.log"
"#;
    write_file(&cfg_path, toml);

    let rc = ConfigLoader::load(Some(&cfg_path), None).expect("should load");
    assert_eq!(rc.logging.level, "debug");
    assert_eq!(rc.logging.file.unwrap().display().to_string(), "/tmp/indexq/indexq.log");
}
