use assert_cmd::prelude::*;
use indexq_core::content::Fields;
use indexq_core::queue::{ContentId, Identity, RowKey};
use indexq_core::search::{FtsIndexer, Indexer};
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn search_finds_indexed_documents() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!("version = 1\n[profiles.default]\ndata_dir = \"{}\"\n", dir.path().display()),
    )
    .unwrap();

    {
        let index = FtsIndexer::open(&dir.path().join("index.db")).unwrap();
        index
            .update(&Identity::parent(ContentId(10)), &fields(&[("title", "harbour lights")]))
            .unwrap();
        index
            .update(
                &Identity::child_row(ContentId(10), RowKey::new(2, 1)),
                &fields(&[("caption", "lighthouse at dusk")]),
            )
            .unwrap();
        index
            .update(&Identity::parent(ContentId(11)), &fields(&[("title", "mountain pass")]))
            .unwrap();
        index.commit().unwrap();
    }

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("indexq"));
    cmd.arg("--config").arg(&config).args(["search", "lighthouse"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("10:2:1"));

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("indexq"));
    cmd.arg("--config").arg(&config).args(["search", "volcano"]);
    cmd.assert().success().stdout(predicate::str::contains("(no results found)"));
}

#[test]
fn search_fails_without_index() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!("version = 1\n[profiles.default]\ndata_dir = \"{}\"\n", dir.path().display()),
    )
    .unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("indexq"));
    cmd.arg("--config").arg(&config).args(["search", "anything"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Index not found"))
        .stderr(predicate::str::contains("check `index_db`"))
        .stderr(predicate::str::contains("Start the queue worker").not());
}
