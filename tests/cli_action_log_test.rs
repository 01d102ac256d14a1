//! Integration tests for the command audit log.

mod common;

use common::TestEnv;
use serde_json::Value;

fn read_entries(env: &TestEnv) -> Vec<Value> {
    let path = env.data_path().join("action.log");
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_commands_are_logged() {
    let env = TestEnv::init();
    env.json(&["project", "create", "Planning", "--scale", "1-5"]);

    let entries = read_entries(&env);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["command"], "system init");
    let last = &entries[1];
    assert_eq!(last["command"], "project create");
    assert_eq!(last["args"]["id"], "Planning");
    assert_eq!(last["args"]["scale"], "1-5");
    assert_eq!(last["success"], true);
    assert_eq!(last["user"], "tester");
    assert!(last.get("error").is_none());
}

#[test]
fn test_failures_are_logged_with_error() {
    let env = TestEnv::init();
    env.cf()
        .args(["project", "show", "Nowhere"])
        .assert()
        .failure();

    let entries = read_entries(&env);
    let last = entries.last().unwrap();
    assert_eq!(last["command"], "project show");
    assert_eq!(last["success"], false);
    assert!(last["error"].as_str().unwrap().contains("Nowhere"));
}

#[test]
fn test_long_values_are_truncated() {
    let env = TestEnv::init();
    env.json(&["project", "create", "Planning"]);
    let title = format!("title={}", "x".repeat(500));
    env.cf()
        .args(["-p", "Planning", "card", "create", "epic", "--set", &title])
        .assert()
        .success();

    let entries = read_entries(&env);
    let last = entries.last().unwrap();
    let logged = last["args"]["fields"]["set"][0].as_str().unwrap();
    assert!(logged.len() < 300);
}

#[test]
fn test_action_log_can_be_disabled() {
    let env = TestEnv::init();
    env.json(&["config", "set", "action-log", "false"]);
    let before = read_entries(&env).len();

    env.json(&["lists", "show", "taskStatus"]);
    assert_eq!(read_entries(&env).len(), before);
}
