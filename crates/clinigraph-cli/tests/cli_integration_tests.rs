//! CLI integration tests for clinigraph
//!
//! Tests the clinigraph CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CONCEPTS: &str = r#"{"id":1,"code":10,"parent_id":0,"label":"Neuropathy","show_in_reports":true}
{"id":2,"code":20,"parent_id":1,"group_code":1,"rank_abs":2,"label":"Axonal","show_in_reports":true}
{"id":3,"code":30,"parent_id":1,"group_code":1,"rank_abs":1,"label":"Demyelinating","show_in_reports":true}

{"id":4,"code":40,"parent_id":0,"group_code":2,"label":"Deltoid","show_in_reports":true}
"#;

const ASSOCIATIONS: &str = r#"{"case_id":100,"code":20}
{"case_id":100,"code":20}
{"case_id":100,"code":30}
{"case_id":101,"code":20}
{"case_id":101,"code":40}
{"case_id":102,"code":30}
"#;

/// Isolated config and data directories for one test
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let env = Self {
            dir: TempDir::new().unwrap(),
        };
        let records = env.data_dir().join("records");
        fs::create_dir_all(&records).unwrap();
        fs::write(records.join("concepts.jsonl"), CONCEPTS).unwrap();
        fs::write(records.join("associations.jsonl"), ASSOCIATIONS).unwrap();
        env
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    fn snapshot(&self) -> PathBuf {
        self.data_dir().join("graph.json")
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("clinigraph").unwrap();
        cmd.env("CLINIGRAPH_CONFIG_DIR", self.config_dir());
        cmd.env("CLINIGRAPH_DATA_DIR", self.data_dir());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn built() -> Self {
        let env = Self::new();
        env.cmd().args(["build", "-q"]).assert().success();
        env
    }
}

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new();
    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("associations"))
        .stdout(predicate::str::contains("tree"));
}

#[test]
fn test_build_saves_snapshot() {
    let env = TestEnv::new();
    env.cmd()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build Graph completed."))
        .stdout(predicate::str::contains("Sample nodes:"))
        .stdout(predicate::str::contains("  conc_1\n"))
        .stdout(predicate::str::contains("Graph saved to"));

    assert!(env.snapshot().exists(), "Snapshot should exist");
}

#[test]
fn test_build_no_save() {
    let env = TestEnv::new();
    env.cmd()
        .args(["build", "--no-save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot not written"));

    assert!(!env.snapshot().exists());
}

#[test]
fn test_build_missing_records_fails() {
    let env = TestEnv::new();
    let empty = env.dir.path().join("empty");
    env.cmd()
        .args(["build", "--records-dir"])
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E200"));
}

#[test]
fn test_build_reports_bad_line() {
    let env = TestEnv::new();
    let records = env.dir.path().join("broken");
    fs::create_dir_all(&records).unwrap();
    fs::write(records.join("concepts.jsonl"), "{\"id\":1}\n{oops\n").unwrap();
    fs::write(records.join("associations.jsonl"), ASSOCIATIONS).unwrap();

    env.cmd()
        .args(["build", "--records-dir"])
        .arg(&records)
        .assert()
        .failure()
        .stderr(predicate::str::contains("concepts.jsonl:2"));
}

#[test]
fn test_stats_without_snapshot() {
    let env = TestEnv::new();
    env.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("No graph loaded."));
}

#[test]
fn test_stats_after_build() {
    let env = TestEnv::built();
    env.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total nodes: 7"))
        .stdout(predicate::str::contains("Case nodes: 3"))
        .stdout(predicate::str::contains("IS-A edges: 2"))
        .stdout(predicate::str::contains("CASE-OF edges: 5"));
}

#[test]
fn test_stats_json() {
    let env = TestEnv::built();
    let output = env.cmd().args(["stats", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "graph");
    assert_eq!(value["total_nodes"], 7);
    assert_eq!(value["concept_nodes"], 4);
}

#[test]
fn test_explicit_snapshot_path() {
    let env = TestEnv::new();
    let custom = env.dir.path().join("elsewhere").join("kb.json");
    env.cmd()
        .args(["build", "-q", "--snapshot"])
        .arg(&custom)
        .assert()
        .success();
    assert!(custom.exists());
    assert!(!env.snapshot().exists());

    env.cmd()
        .args(["stats", "--snapshot"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total nodes: 7"));
}

#[test]
fn test_case_subgraph() {
    let env = TestEnv::built();
    env.cmd()
        .args(["case", "100", "--max-depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Case 100 (max depth 1): 4 nodes"))
        .stdout(predicate::str::contains("Axonal [20] (Studies: 2)"))
        .stdout(predicate::str::contains("Depth 1:\n  Neuropathy [10]\n"))
        .stdout(predicate::str::contains("case_100 -CASE-OF-> conc_2"));
}

#[test]
fn test_case_unknown() {
    let env = TestEnv::built();
    env.cmd()
        .args(["case", "999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data for case 999"));
}

#[test]
fn test_case_json_depths() {
    let env = TestEnv::built();
    let output = env
        .cmd()
        .args(["case", "100", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["found"], true);
    assert_eq!(value["max_depth"], 2);
    assert_eq!(value["depths"]["conc_2"], 0);
    assert_eq!(value["depths"]["conc_1"], 1);
}

#[test]
fn test_query_without_snapshot_fails() {
    let env = TestEnv::new();
    env.cmd()
        .args(["case", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E100"))
        .stderr(predicate::str::contains("clinigraph build"));
}

#[test]
fn test_corrupt_snapshot_fails() {
    let env = TestEnv::built();
    fs::write(env.snapshot(), "{\"format_version\":1}").unwrap();
    env.cmd()
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_associations_default_counts_final_conclusions() {
    let env = TestEnv::built();
    env.cmd()
        .args(["associations", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  30 [Demyelinating] => 1/2\n"))
        .stdout(predicate::str::contains("Deltoid").not());
}

#[test]
fn test_associations_ranked() {
    let env = TestEnv::built();
    env.cmd()
        .args(["associations", "2", "--group", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  40 [Deltoid] => 1/2\n  30 [Demyelinating] => 1/2\n",
        ));
}

#[test]
fn test_associations_group_filter() {
    let env = TestEnv::built();
    env.cmd()
        .args(["associations", "2", "--group", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30 [Demyelinating] => 1/2"))
        .stdout(predicate::str::contains("Deltoid").not());

    env.cmd()
        .args(["associations", "2", "--group", "final"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid group code"));
}

#[test]
fn test_associations_default_group_from_config() {
    let env = TestEnv::built();
    env.cmd()
        .args(["config", "set", "associations.default_group", "2"])
        .assert()
        .success();

    let output = env
        .cmd()
        .args(["associations", "2", "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["group"], 2);
    let entries = value["associations"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["label"], "Deltoid");
    assert_eq!(entries[0]["total_cases"], 2);
}

#[test]
fn test_studies() {
    let env = TestEnv::built();
    env.cmd()
        .args(["studies", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  100\n  102\n"));

    env.cmd()
        .args(["studies", "77"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data for concept 77"));
}

#[test]
fn test_tree() {
    let env = TestEnv::built();
    env.cmd()
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "Neuropathy [10]\n",
            "  Axonal [20] (Studies: 2)\n",
            "  Demyelinating [30] (Studies: 2)\n",
            "Deltoid [40] (Studies: 1)\n",
        )));

    env.cmd()
        .args(["tree", "--depth", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Neuropathy [10] +\n"));
}

#[test]
fn test_config_set_get_reset() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "set", "graph.default_max_depth", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set graph.default_max_depth = 3"));

    env.cmd()
        .args(["config", "get", "graph.default_max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    env.cmd()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph.sample_node_limit = 30"));

    env.cmd().args(["config", "reset"]).assert().success();
    env.cmd()
        .args(["config", "get", "graph.default_max_depth"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "set", "graph.colour", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_path_uses_env_override() {
    let env = TestEnv::new();
    env.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(
            env.config_dir().display().to_string(),
        ));
}
