//! CLI smoke tests for the statistics binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const SCENE_JSON: &str = r#"{
  "items": [
    { "id": "1", "name": "case01" },
    { "id": "2", "name": "Pre-op MR", "parent": "1" },
    { "id": "3", "name": "T1", "content_ref": "vtkMRMLScalarVolumeNode1", "parent": "2" }
  ]
}"#;

#[test]
fn test_collect_writes_summary() {
    let scenes = tempfile::tempdir().expect("tempdir");
    fs::write(scenes.path().join("case01.json"), SCENE_JSON).expect("write scene");
    let out = tempfile::tempdir().expect("tempdir");

    Command::cargo_bin("scenetree-statistics")
        .expect("binary built")
        .args(["collect", &scenes.path().to_string_lossy()])
        .args(["--output", &out.path().to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenes: 1"))
        .stdout(predicate::str::contains("volume: 1"));

    let summary = out.path().join("scene_statistics.json");
    assert!(summary.exists());
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(summary).expect("read summary"))
            .expect("valid JSON");
    assert_eq!(value["scenes"][0]["subject"], "case01");
}

#[test]
fn test_collect_empty_root_fails() {
    let scenes = tempfile::tempdir().expect("tempdir");

    Command::cargo_bin("scenetree-statistics")
        .expect("binary built")
        .args(["collect", &scenes.path().to_string_lossy()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scene description files"));
}
