//! Integration tests for the authslot command line

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Test environment with an initialized config pointing at a record file
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
    store_path: PathBuf,
}

impl TestEnv {
    fn new(record: Value) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("record.json");
        fs::write(&store_path, serde_json::to_string_pretty(&record).unwrap()).unwrap();

        authslot_cmd()
            .args([
                "init",
                "--config",
                config_path.to_str().unwrap(),
                "--store",
                store_path.to_str().unwrap(),
            ])
            .assert()
            .success();

        Self {
            temp_dir,
            config_path,
            store_path,
        }
    }

    /// Run authslot with this test env's config
    fn authslot(&self) -> AssertCommand {
        let mut cmd = authslot_cmd();
        cmd.args(["--config", self.config_path.to_str().unwrap()]);
        cmd
    }

    fn record(&self) -> Value {
        let raw = fs::read_to_string(&self.store_path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn append_config(&self, extra: &str) {
        let mut content = fs::read_to_string(&self.config_path).unwrap();
        content.push_str(extra);
        fs::write(&self.config_path, content).unwrap();
    }
}

fn authslot_cmd() -> AssertCommand {
    let mut cmd = AssertCommand::cargo_bin("authslot").unwrap();
    cmd.env_remove("AUTHSLOT_LOG");
    cmd
}

fn blank() -> Value {
    json!({"creatorNames": [{}], "familyNames": [{}], "givenNames": [{}]})
}

fn author(name: &str) -> Value {
    json!({
        "creatorNames": [{"creatorName": name}],
        "familyNames": [{}],
        "givenNames": [{}]
    })
}

// =============================================================================
// Init
// =============================================================================

#[test]
fn test_init_writes_config_with_store() {
    let env = TestEnv::new(json!({}));

    let content = fs::read_to_string(&env.config_path).unwrap();
    assert!(content.contains("[author]"));
    assert!(content.contains(r#"creator_names = "creatorNames""#));
    assert!(content.contains(env.store_path.to_str().unwrap()));
}

#[test]
fn test_init_fails_if_config_exists_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "existing config").unwrap();

    authslot_cmd()
        .args(["init", "--config", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing config");
}

#[test]
fn test_init_force_overwrites_existing_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "old config").unwrap();

    authslot_cmd()
        .args(["init", "--config", config_path.to_str().unwrap(), "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[fields]"));
}

// =============================================================================
// Apply
// =============================================================================

#[test]
fn test_apply_list_fills_first_gap() {
    let env = TestEnv::new(json!({
        "item_1": [author("A"), blank(), author("C")],
        "title": "Untouched"
    }));

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--list",
            "--payload",
            author("B").to_string().as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated item_1[1]"));

    assert_eq!(
        env.record(),
        json!({
            "item_1": [author("A"), author("B"), author("C")],
            "title": "Untouched"
        })
    );
}

#[test]
fn test_apply_without_gap_overwrites_first_entry() {
    let env = TestEnv::new(json!({"item_1": [author("A"), author("B")]}));

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--list",
            "--payload",
            author("C").to_string().as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("first entry overwritten"));

    assert_eq!(env.record(), json!({"item_1": [author("C"), author("B")]}));
}

#[test]
fn test_apply_single_replaces_value() {
    let env = TestEnv::new(json!({"item_2": author("Old")}));

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_2",
            "--single",
            "--payload",
            author("New").to_string().as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Replaced item_2"));

    assert_eq!(env.record(), json!({"item_2": author("New")}));
}

#[test]
fn test_apply_infers_list_from_current_value() {
    let env = TestEnv::new(json!({"item_1": [blank(), blank()]}));

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--payload",
            author("A").to_string().as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated item_1[0]"));

    assert_eq!(env.record(), json!({"item_1": [author("A"), blank()]}));
}

#[test]
fn test_apply_uses_configured_field_kind() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    env.append_config("item_1 = \"single\"\n");

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--payload",
            author("A").to_string().as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Replaced item_1"));

    assert_eq!(env.record(), json!({"item_1": author("A")}));
}

#[test]
fn test_apply_reads_payload_file() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    let payload_path = env.temp_dir.path().join("author.json");
    fs::write(&payload_path, author("File").to_string()).unwrap();

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--list",
            "--payload-file",
            payload_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(env.record(), json!({"item_1": [author("File")]}));
}

#[test]
fn test_apply_reads_payload_from_stdin() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));

    env.authslot()
        .args(["apply", "--field", "item_1", "--list", "--payload-file", "-"])
        .write_stdin(author("Stdin").to_string())
        .assert()
        .success();

    assert_eq!(env.record(), json!({"item_1": [author("Stdin")]}));
}

#[test]
fn test_apply_malformed_payload_leaves_file_untouched() {
    let env = TestEnv::new(json!({"item_1": [blank(), author("B")]}));
    let before = fs::read(&env.store_path).unwrap();

    env.authslot()
        .args(["apply", "--field", "item_1", "--list", "--payload", "{oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));

    assert_eq!(fs::read(&env.store_path).unwrap(), before);
}

#[test]
fn test_apply_unknown_field_fails() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    let before = fs::read(&env.store_path).unwrap();

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_9",
            "--payload",
            author("A").to_string().as_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("item_9"));

    assert_eq!(fs::read(&env.store_path).unwrap(), before);
}

#[test]
fn test_apply_requires_payload() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));

    env.authslot()
        .args(["apply", "--field", "item_1"])
        .assert()
        .failure();
}

#[test]
fn test_apply_list_and_single_conflict() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));

    env.authslot()
        .args([
            "apply", "--field", "item_1", "--list", "--single", "--payload", "{}",
        ])
        .assert()
        .failure();
}

// =============================================================================
// Inspection
// =============================================================================

#[test]
fn test_show_prints_field() {
    let env = TestEnv::new(json!({"item_1": [author("Curie")]}));

    env.authslot()
        .args(["show", "--field", "item_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Curie"));
}

#[test]
fn test_show_missing_field_fails() {
    let env = TestEnv::new(json!({}));

    env.authslot()
        .args(["show", "--field", "item_1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_slots_lists_states_and_next_target() {
    let env = TestEnv::new(json!({"item_1": [author("A"), blank(), author("C")]}));

    env.authslot()
        .args(["slots", "--field", "item_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0\tfilled\tA"))
        .stdout(predicate::str::contains("1\tempty\t"))
        .stdout(predicate::str::contains("2\tfilled\tC"))
        .stdout(predicate::str::contains("next: 1"));
}

#[test]
fn test_slots_warns_when_no_gap() {
    let env = TestEnv::new(json!({"item_1": [author("A")]}));

    env.authslot()
        .args(["slots", "--field", "item_1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: 0 (no empty slot"));
}

#[test]
fn test_store_flag_overrides_config() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    let other = env.temp_dir.path().join("other.json");
    fs::write(&other, json!({"item_1": [author("Other")]}).to_string()).unwrap();

    env.authslot()
        .args(["show", "--field", "item_1", "--store", other.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Other"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");

    authslot_cmd()
        .args([
            "--config",
            missing.to_str().unwrap(),
            "show",
            "--field",
            "item_1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_apply_blank_field_and_payload_is_an_error() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    let before = fs::read(&env.store_path).unwrap();

    env.authslot()
        .args(["apply", "--field", "", "--single", "--payload", ""])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Nothing to apply").not())
        .stderr(predicate::str::contains("not valid JSON"));

    assert_eq!(fs::read(&env.store_path).unwrap(), before);
}

#[test]
fn test_apply_missing_payload_file_leaves_record_alone() {
    let env = TestEnv::new(json!({"item_1": [blank()]}));
    let before = fs::read(&env.store_path).unwrap();
    let missing = env.temp_dir.path().join("missing.json");

    env.authslot()
        .args([
            "apply",
            "--field",
            "item_1",
            "--list",
            "--payload-file",
            missing.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read payload file"));

    assert_eq!(fs::read(&env.store_path).unwrap(), before);
}

#[test]
fn test_apply_keeps_key_order_and_large_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let store_path = temp_dir.path().join("record.json");
    fs::write(
        &store_path,
        r#"{"zeta_id": 123456789012345678901234567890, "item_1": [{"creatorNames": [{}], "familyNames": [{}], "givenNames": [{}]}], "alpha": 1}"#,
    )
    .unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    authslot_cmd()
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "apply",
            "--field",
            "item_1",
            "--list",
            "--store",
            store_path.to_str().unwrap(),
            "--payload",
            author("A").to_string().as_str(),
        ])
        .assert()
        .success();

    let raw = fs::read_to_string(&store_path).unwrap();
    assert!(raw.contains("123456789012345678901234567890"));
    let zeta = raw.find("\"zeta_id\"").unwrap();
    let item = raw.find("\"item_1\"").unwrap();
    let alpha = raw.find("\"alpha\"").unwrap();
    assert!(zeta < item && item < alpha);
}

#[test]
fn test_show_single_list_entry() {
    let env = TestEnv::new(json!({"item_1": [author("Curie"), author("Noether")]}));

    env.authslot()
        .args(["show", "--field", "item_1", "--index", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Noether"))
        .stdout(predicate::str::contains("Curie").not());

    env.authslot()
        .args(["show", "--field", "item_1", "--index", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no list entry at index 2"));
}
