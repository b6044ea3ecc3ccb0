//! Tests for Registry
//!
//! These tests verify:
//! - One engine per path, shared across handles
//! - Path normalization
//! - Independent registries do not share state
//! - close_all flushes and forgets engines

use shardex::{Config, Engine, Registry};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(temp_dir: &TempDir, name: &str) -> Config {
    Config::builder()
        .data_dir(temp_dir.path().join(name))
        .flush_interval_ms(60_000)
        .build()
}

// =============================================================================
// Instance Sharing Tests
// =============================================================================

#[test]
fn test_same_path_returns_same_engine() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();

    let a = registry.open(config_for(&temp, "idx")).unwrap();
    let b = registry.open(config_for(&temp, "idx")).unwrap();

    assert!(Engine::same_instance(&a, &b));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_handles_see_each_others_writes_without_flush() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let a = registry.open(config_for(&temp, "idx")).unwrap();
    let b = registry.open(config_for(&temp, "idx")).unwrap();

    assert!(a.get("Netflix").unwrap().is_empty());
    assert!(b.get("Netflix").unwrap().is_empty());

    a.update("Netflix", "The Crown").unwrap();

    assert_eq!(a.get("Netflix").unwrap(), vec!["The Crown"]);
    assert_eq!(b.get("Netflix").unwrap(), vec!["The Crown"]);
    assert!(!temp.path().join("idx").exists());
}

#[test]
fn test_equivalent_paths_share_engine() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();

    let plain = registry.open_path(&temp.path().join("idx")).unwrap();
    let dotted = registry
        .open_path(&temp.path().join(".").join("idx"))
        .unwrap();

    assert!(Engine::same_instance(&plain, &dotted));
}

#[test]
fn test_path_normalization_survives_directory_creation() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let before = registry.open(config_for(&temp, "idx")).unwrap();
    before.put("k", "v").unwrap();
    before.flush(true).unwrap();
    assert!(temp.path().join("idx").exists());

    let after = registry.open(config_for(&temp, "idx")).unwrap();

    assert!(Engine::same_instance(&before, &after));
}

#[test]
fn test_different_paths_are_independent() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let one = registry.open(config_for(&temp, "one")).unwrap();
    let two = registry.open(config_for(&temp, "two")).unwrap();

    one.put("k", "v").unwrap();

    assert!(!Engine::same_instance(&one, &two));
    assert!(two.get("k").unwrap().is_empty());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_separate_registries_do_not_share() {
    let temp = TempDir::new().unwrap();
    let first = Registry::new();
    let second = Registry::new();

    let a = first.open(config_for(&temp, "idx")).unwrap();
    let b = second.open(config_for(&temp, "idx")).unwrap();

    assert!(!Engine::same_instance(&a, &b));
}

#[test]
fn test_get_returns_registered_engine() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    assert!(registry.get(&temp.path().join("idx")).is_none());

    let opened = registry.open(config_for(&temp, "idx")).unwrap();
    let found = registry.get(&temp.path().join("idx")).unwrap();

    assert!(Engine::same_instance(&opened, &found));
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_all_flushes_and_forgets() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::new();
    let engine = registry.open(config_for(&temp, "idx")).unwrap();
    engine.put("k", "v").unwrap();
    drop(engine);

    registry.close_all().unwrap();

    assert!(registry.is_empty());
    let reopened = registry.open(config_for(&temp, "idx")).unwrap();
    assert_eq!(reopened.get("k").unwrap(), vec!["v"]);
}

#[test]
fn test_close_all_on_empty_registry() {
    let registry = Registry::new();

    registry.close_all().unwrap();

    assert_eq!(registry.len(), 0);
}
