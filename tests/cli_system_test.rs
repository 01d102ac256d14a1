//! Integration tests for system init, projects, the directory, priority
//! and vocabulary commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_init_seeds_lists_once() {
    let env = TestEnv::new();
    let first = env.json(&["system", "init"]);
    assert_eq!(first["initialized"], true);
    assert_eq!(
        first["seededLists"],
        json!(["taskStatus", "bugStatus", "bugPriority"])
    );
    assert!(env.data_path().join("cardflow.db").exists());

    let second = env.json(&["system", "init"]);
    assert_eq!(second["initialized"], false);
    assert_eq!(second["seededLists"], json!([]));
}

#[test]
fn test_commands_before_init_hint_at_init() {
    let env = TestEnv::new();
    let err = env.json_error(&["-p", "Planning", "card", "list", "task"]);
    assert!(err["error"].as_str().unwrap().contains("Not initialized"));
    assert!(err["hint"].as_str().unwrap().contains("cf system init"));
}

#[test]
fn test_version_includes_build_info() {
    TestEnv::new()
        .cf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")))
        .stdout(predicate::str::contains("built"));
}

#[test]
fn test_project_create_and_show() {
    let env = TestEnv::init();
    let created = env.json(&[
        "project",
        "create",
        "Mobile",
        "--name",
        "Mobile App",
        "--scale",
        "fib",
    ]);
    assert_eq!(created["id"], "Mobile");
    assert_eq!(created["project"]["name"], "Mobile App");
    assert_eq!(created["project"]["scoringSystem"], "fibonacci");

    let shown = env.json(&["project", "show", "Mobile"]);
    assert_eq!(shown["project"]["name"], "Mobile App");

    env.cf()
        .args(["project", "create", "Mobile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_project_rejects_bad_scale_and_validator() {
    let env = TestEnv::init();
    env.cf()
        .args(["project", "create", "Mobile", "--scale", "t-shirt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scale"));

    let err = env.json_error(&[
        "project",
        "create",
        "Mobile",
        "--default-validator",
        "dev_001",
    ]);
    assert_eq!(err["violation"]["kind"], "InvalidReferenceFormat");
}

#[test]
fn test_person_add_joins_roster_once() {
    let env = TestEnv::init();
    env.json(&["project", "create", "Planning"]);
    for _ in 0..2 {
        env.json(&[
            "developer",
            "add",
            "dev_007",
            "--name",
            "Bond",
            "--join",
            "Planning",
        ]);
    }
    let shown = env.json(&["project", "show", "Planning"]);
    assert_eq!(shown["project"]["developers"], json!(["dev_007"]));

    let err = env.json_error(&["stakeholder", "add", "dev_008", "--name", "Q"]);
    assert_eq!(err["violation"]["kind"], "InvalidReferenceFormat");
}

#[test]
fn test_rules_describe_the_task_workflow() {
    let env = TestEnv::new();
    let rules = env.json(&["rules", "task"]);
    assert_eq!(rules["initialStatus"], "To Do");
    let statuses = rules["validStatuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 6);
    assert_eq!(rules["validatorOnly"], json!(["Done&Validated"]));

    let epic = env.json(&["rules", "epic"]);
    assert_eq!(epic["validStatuses"], json!([]));
}

#[test]
fn test_priority_table_and_calc() {
    let env = TestEnv::init();
    let table = env.json(&["priority", "table", "--scale", "1-5"]);
    let entries = table["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 25);
    assert_eq!(entries[0]["rank"], 1);

    let fib = env.json(&["priority", "table", "--scale", "fibonacci"]);
    assert_eq!(fib["entries"].as_array().unwrap().len(), 36);

    let calc = env.json(&["priority", "calc", "-b", "5", "-e", "1", "--scale", "1-5"]);
    assert_eq!(calc["priority"], 1);

    let partial = env.json(&["priority", "calc", "-b", "5", "--scale", "1-5"]);
    assert!(partial["priority"].is_null());

    env.cf()
        .args(["priority", "calc", "-b", "4", "-e", "1", "--scale", "fibonacci"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not on the fibonacci scale"));
}

#[test]
fn test_priority_uses_project_scale() {
    let env = TestEnv::init();
    env.json(&["project", "create", "Mobile", "--scale", "fibonacci"]);
    let table = env.json(&["-p", "Mobile", "priority", "table"]);
    assert_eq!(table["scale"], "fibonacci");
}

#[test]
fn test_lists_show_and_invalidate() {
    let env = TestEnv::init();
    let statuses = env.json(&["lists", "show", "taskStatus"]);
    assert_eq!(statuses["kind"], "taskStatus");
    assert!(
        statuses["values"]
            .as_array()
            .unwrap()
            .contains(&json!("Done&Validated"))
    );

    let priorities = env.json(&["lists", "show", "bugPriority"]);
    assert_eq!(priorities["values"].as_array().unwrap().len(), 6);

    let all = env.json(&["lists", "invalidate"]);
    assert_eq!(all["invalidated"].as_array().unwrap().len(), 3);
    let one = env.json(&["lists", "invalidate", "bugStatus"]);
    assert_eq!(one["invalidated"], json!(["bugStatus"]));

    env.cf()
        .args(["lists", "show", "epicStatus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown list kind"));
}
