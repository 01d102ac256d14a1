//! Integration tests for the MCP stdio server.

mod common;

use common::{TestEnv, task_json};
use serde_json::{Value, json};

/// Send newline-delimited requests and collect one response per line.
fn mcp_session(env: &TestEnv, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|r| format!("{}\n", r)).collect();
    let output = env
        .cf()
        .args(["mcp", "serve"])
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "mcp serve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

/// Parse the text payload of a tools/call result.
fn tool_body(response: &Value) -> (Value, bool) {
    let result = &response["result"];
    let text = result["content"][0]["text"].as_str().unwrap();
    (
        serde_json::from_str(text).unwrap(),
        result["isError"].as_bool().unwrap(),
    )
}

#[test]
fn test_manifest_lists_tools() {
    let env = TestEnv::new();
    let output = env.cf().args(["mcp", "manifest"]).output().unwrap();
    assert!(output.status.success());
    let manifest: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(manifest["name"], "cardflow");
    let names: Vec<&str> = manifest["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    for tool in ["create_card", "update_card", "get_transition_rules", "calculate_priority"] {
        assert!(names.contains(&tool), "missing {tool}");
    }
}

#[test]
fn test_handshake_and_tool_listing() {
    let env = TestEnv::init();
    let responses = mcp_session(
        &env,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05", "capabilities": {}}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
        ],
    );
    // The notification gets no reply.
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "cardflow");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 8);
    assert_eq!(responses[2]["result"], json!({}));
}

#[test]
fn test_protocol_errors() {
    let env = TestEnv::init();
    let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n";
    let output = env
        .cf()
        .args(["mcp", "serve"])
        .write_stdin(input)
        .output()
        .unwrap();
    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[1]["id"], 7);
}

#[test]
fn test_create_and_update_through_tools() {
    let env = TestEnv::with_project();
    let fields: Value = serde_json::from_str(&task_json("Export CSV")).unwrap();
    let responses = mcp_session(
        &env,
        &[
            call(
                1,
                "create_card",
                json!({"project": "Planning", "cardType": "task", "fields": fields, "user": "agent"}),
            ),
            call(
                2,
                "update_card",
                json!({"project": "Planning", "cardType": "task", "id": "PLN-TSK-0001",
                       "updates": {"businessPoints": 5, "devPoints": 1}}),
            ),
            call(
                3,
                "get_card",
                json!({"project": "Planning", "cardType": "task", "id": "PLN-TSK-0001"}),
            ),
        ],
    );

    let (created, is_error) = tool_body(&responses[0]);
    assert!(!is_error);
    assert_eq!(created["cardId"], "PLN-TSK-0001");
    assert_eq!(created["card"]["createdBy"], "agent");

    let (updated, is_error) = tool_body(&responses[1]);
    assert!(!is_error);
    assert_eq!(updated["card"]["priority"], 1);

    let (shown, _) = tool_body(&responses[2]);
    assert_eq!(shown["card"]["priority"], 1);
    assert_eq!(shown["card"]["createdBy"], "agent");
}

#[test]
fn test_rejections_are_tool_errors() {
    let env = TestEnv::with_project();
    let responses = mcp_session(
        &env,
        &[
            call(
                1,
                "create_card",
                json!({"project": "Planning", "cardType": "task", "fields": {"title": "Orphan"}}),
            ),
            call(
                2,
                "create_card",
                json!({"project": "Planning", "cardType": "task",
                       "fields": {"title": "Orphan", "priority": 2}, "validateOnly": true}),
            ),
        ],
    );

    // A rejected mutation is a successful JSON-RPC call with isError set.
    assert!(responses[0].get("error").is_none());
    let (body, is_error) = tool_body(&responses[0]);
    assert!(is_error);
    assert_eq!(body["violation"]["kind"], "EpicRequired");

    let (report, is_error) = tool_body(&responses[1]);
    assert!(!is_error);
    assert_eq!(report["valid"], false);
    assert!(report["violations"].as_array().unwrap().len() >= 2);
}

#[test]
fn test_introspection_tools() {
    let env = TestEnv::with_project();
    let responses = mcp_session(
        &env,
        &[
            call(1, "get_transition_rules", json!({"cardType": "bug"})),
            call(
                2,
                "calculate_priority",
                json!({"businessPoints": 13, "devPoints": 1, "scale": "fibonacci"}),
            ),
            call(3, "list_vocabulary", json!({"kind": "bugStatus"})),
            call(4, "invalidate_vocabulary", json!({})),
            call(5, "no_such_tool", json!({})),
        ],
    );

    let (rules, _) = tool_body(&responses[0]);
    assert_eq!(rules["initialStatus"], "Created");

    let (priority, _) = tool_body(&responses[1]);
    assert_eq!(priority["priority"], 1);

    let (list, _) = tool_body(&responses[2]);
    assert_eq!(list["values"][0], "Created");

    let (invalidated, _) = tool_body(&responses[3]);
    assert_eq!(invalidated["invalidated"].as_array().unwrap().len(), 3);

    let (_, is_error) = tool_body(&responses[4]);
    assert!(is_error);
}
