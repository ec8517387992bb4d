//! Tests for the filesystem-only commands (`init`, `new`)

#![allow(clippy::unwrap_used)]

use revisions::config::RevisionsConfig;
use revisions::{hash, HashAlgorithm};
use revisions_cli::cli::GlobalArgs;
use revisions_cli::commands;
use revisions_cli::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn settings_for(dir: &TempDir) -> Settings {
    let config_path = dir.path().join("revisions.toml");
    let config = RevisionsConfig::load_file(&config_path).unwrap();
    Settings::merge(config_path, config, &GlobalArgs::default(), None)
}

#[test]
fn test_init_writes_config_and_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("revisions.toml");
    let args = GlobalArgs {
        namespace: Some("billing".to_string()),
        directory: Some(PathBuf::from("db/revisions")),
        ..GlobalArgs::default()
    };

    let report = commands::init(&config_path, &args, false).unwrap();

    assert_eq!(report.config_path, config_path);
    assert_eq!(report.directory, temp_dir.path().join("db/revisions"));
    assert!(report.directory.is_dir());

    let config = RevisionsConfig::load_file(&config_path).unwrap();
    assert_eq!(config.namespace, "billing");
    assert_eq!(config.directory, PathBuf::from("db/revisions"));
    assert_eq!(config.database.table, "revisions");
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("revisions.toml");
    fs::write(&config_path, "namespace = \"keep\"\n").unwrap();

    let result = commands::init(&config_path, &GlobalArgs::default(), false);
    match result {
        Err(e) => assert!(e.to_string().contains("already exists")),
        Ok(_) => panic!("Expected init to refuse an existing config file"),
    }
    assert_eq!(
        RevisionsConfig::load_file(&config_path).unwrap().namespace,
        "keep"
    );

    commands::init(&config_path, &GlobalArgs::default(), true).unwrap();
    assert_eq!(
        RevisionsConfig::load_file(&config_path).unwrap().namespace,
        "default"
    );
}

#[test]
fn test_new_creates_root_revision() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_for(&temp_dir);

    let path = commands::new_revision(&settings, "Create users table").unwrap();

    assert!(path.starts_with(temp_dir.path().join("revisions")));
    let file_name = path.file_name().unwrap().to_str().unwrap();
    assert!(file_name.ends_with("_create-users-table.revision.toml"));

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("# Create users table"));
    assert!(!contents.contains("previous_version"));
}

#[test]
fn test_new_extends_current_tip() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_for(&temp_dir);
    let directory = temp_dir.path().join("revisions");
    fs::create_dir_all(&directory).unwrap();

    let root = "up = \"CREATE TABLE users (id INT);\"\ndown = \"DROP TABLE users;\"\n";
    fs::write(directory.join("001_users.revision.toml"), root).unwrap();
    let root_version = hash(root, HashAlgorithm::Sha256);

    let path = commands::new_revision(&settings, "add email").unwrap();

    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains(&format!("previous_version = \"{root_version}\"")));
}

#[test]
fn test_new_rejects_broken_chain() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_for(&temp_dir);
    let directory = temp_dir.path().join("revisions");
    fs::create_dir_all(&directory).unwrap();
    fs::write(
        directory.join("001_orphan.revision.toml"),
        "previous_version = \"deadbeef\"\nup = \"\"\ndown = \"\"\n",
    )
    .unwrap();

    assert!(commands::new_revision(&settings, "next").is_err());
    assert_eq!(fs::read_dir(&directory).unwrap().count(), 1);
}
