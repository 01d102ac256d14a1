//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides:
//! - `cf mcp serve` - Start stdio MCP server
//! - `cf mcp manifest` - Output tool definitions
//!
//! The server speaks JSON-RPC 2.0, one message per line. Engine operations
//! are exposed as tools; a tool failure is a normal response with
//! `isError: true` and the structured error as its content.

use crate::commands::{self, CardTarget, Context};
use crate::lookup::ListKind;
use crate::models::{CardType, Document, PointScale};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::io::{BufRead, Write};

pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "cardflow";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// An incoming JSON-RPC message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Tool definition for the MCP manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn card_type_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["task", "bug", "epic", "sprint", "proposal", "qa"]
    })
}

fn project_schema() -> Value {
    json!({
        "type": "string",
        "description": "Project id; defaults to the configured default-project"
    })
}

/// All available MCP tools.
pub fn tool_definitions() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_card",
            description: "Create a card. Runs every rule of the card's workflow; with validateOnly, reports all violations and writes nothing.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_schema(),
                    "cardType": card_type_schema(),
                    "fields": {"type": "object", "description": "Card fields (camelCase)"},
                    "validateOnly": {"type": "boolean"},
                    "user": {"type": "string"}
                },
                "required": ["cardType", "fields"]
            }),
        },
        ToolDef {
            name: "update_card",
            description: "Apply a partial update to a card, enforcing transition gates and filling derived fields.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_schema(),
                    "cardType": card_type_schema(),
                    "id": {"type": "string", "description": "Card id (PLN-TSK-0007) or storage key"},
                    "updates": {"type": "object"},
                    "validateOnly": {"type": "boolean"},
                    "user": {"type": "string"}
                },
                "required": ["cardType", "id", "updates"]
            }),
        },
        ToolDef {
            name: "get_card",
            description: "Fetch one card by id or storage key",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_schema(),
                    "cardType": card_type_schema(),
                    "id": {"type": "string"}
                },
                "required": ["cardType", "id"]
            }),
        },
        ToolDef {
            name: "get_transition_rules",
            description: "Valid statuses, transition table and required fields per transition for a card type",
            input_schema: json!({
                "type": "object",
                "properties": {"cardType": card_type_schema()},
                "required": ["cardType"]
            }),
        },
        ToolDef {
            name: "get_available_transitions",
            description: "For a stored card, which statuses are reachable and which fields each one still needs",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": project_schema(),
                    "cardType": card_type_schema(),
                    "id": {"type": "string"}
                },
                "required": ["cardType", "id"]
            }),
        },
        ToolDef {
            name: "calculate_priority",
            description: "Priority rank for business value and effort points on a scale",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "businessPoints": {"type": "integer"},
                    "devPoints": {"type": "integer"},
                    "scale": {"type": "string", "enum": ["1-5", "fibonacci"]},
                    "project": project_schema()
                }
            }),
        },
        ToolDef {
            name: "list_vocabulary",
            description: "Canonical values of a controlled vocabulary list",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "kind": {"type": "string", "enum": ["taskStatus", "bugStatus", "bugPriority"]}
                },
                "required": ["kind"]
            }),
        },
        ToolDef {
            name: "invalidate_vocabulary",
            description: "Drop cached vocabulary values (one list, or all when kind is omitted)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "kind": {"type": "string", "enum": ["taskStatus", "bugStatus", "bugPriority"]}
                }
            }),
        },
    ]
}

/// The tool manifest printed by `cf mcp manifest`.
pub fn manifest() -> Value {
    json!({
        "name": SERVER_NAME,
        "protocolVersion": MCP_VERSION,
        "tools": tool_definitions(),
    })
}

pub fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "result": result,
    })
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id.unwrap_or(Value::Null),
        "error": {"code": code, "message": message},
    })
}

fn str_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    str_arg(args, name).ok_or_else(|| Error::InvalidInput(format!("Missing argument: {}", name)))
}

fn bool_arg(args: &Map<String, Value>, name: &str) -> bool {
    args.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn u32_arg(args: &Map<String, Value>, name: &str) -> Result<Option<u32>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| Error::InvalidInput(format!("{} must be a positive integer", name))),
    }
}

fn object_arg(args: &Map<String, Value>, name: &str) -> Result<Document> {
    match args.get(name) {
        Some(Value::Object(map)) => Ok(map.clone()),
        None | Some(Value::Null) => Ok(Document::new()),
        Some(other) => Err(Error::InvalidInput(format!(
            "{} must be an object, got {}",
            name, other
        ))),
    }
}

fn card_type_arg(args: &Map<String, Value>) -> Result<CardType> {
    required_str(args, "cardType")?
        .parse::<CardType>()
        .map_err(Error::InvalidInput)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Stateful MCP session over one [`Context`].
///
/// The vocabulary cache lives as long as the server, so list edits made by
/// other processes show up after the TTL or an `invalidate_vocabulary` call.
pub struct McpServer {
    ctx: Context,
    initialized: bool,
}

impl McpServer {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            initialized: false,
        }
    }

    /// Handle one raw line. `None` for notifications and blank lines.
    pub fn handle_line(&mut self, line: &str) -> Option<Value> {
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                let id = serde_json::from_str::<Value>(line)
                    .ok()
                    .and_then(|v| v.get("id").cloned());
                let (code, message) = if id.is_some() {
                    (INVALID_REQUEST, format!("Invalid request: {}", e))
                } else {
                    (PARSE_ERROR, format!("Parse error: {}", e))
                };
                Some(json_rpc_error(id, code, &message))
            }
        }
    }

    pub fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = !matches!(request.id.as_ref(), None | Some(Value::Null));
        tracing::debug!(method, "mcp request");

        if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return expects_response
                .then(|| json_rpc_error(request.id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
        }

        match method {
            "initialize" => {
                let protocol_version = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or(MCP_VERSION);
                Some(json_rpc_response(
                    request.id,
                    json!({
                        "protocolVersion": protocol_version,
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": crate::cli::VERSION
                        },
                        "capabilities": {"tools": {}}
                    }),
                ))
            }
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                None
            }
            "ping" => Some(json_rpc_response(request.id, json!({}))),
            "tools/list" => {
                self.initialized = true;
                Some(json_rpc_response(
                    request.id,
                    json!({"tools": tool_definitions()}),
                ))
            }
            "tools/call" => {
                self.initialized = true;
                let Some(params) = request.params.as_ref().and_then(Value::as_object) else {
                    return Some(json_rpc_error(
                        request.id,
                        INVALID_PARAMS,
                        "params must be an object",
                    ));
                };
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let args = match params.get("arguments") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(map)) => map.clone(),
                    Some(_) => {
                        return Some(json_rpc_error(
                            request.id,
                            INVALID_PARAMS,
                            "arguments must be an object",
                        ));
                    }
                };
                let (body, is_error) = match self.call_tool(name, &args) {
                    Ok(body) => (body, false),
                    Err(e) => {
                        tracing::debug!(tool = name, error = %e, "tool call failed");
                        (e.to_json(), true)
                    }
                };
                Some(json_rpc_response(
                    request.id,
                    json!({
                        "content": [{"type": "text", "text": body.to_string()}],
                        "isError": is_error
                    }),
                ))
            }
            _ if !expects_response => None,
            _ => Some(json_rpc_error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", method),
            )),
        }
    }

    /// Run one tool and return its JSON result.
    pub fn call_tool(&mut self, name: &str, args: &Map<String, Value>) -> Result<Value> {
        let ctx = &self.ctx;
        match name {
            "create_card" => {
                let project = ctx.project_id(str_arg(args, "project"))?;
                let target = CardTarget {
                    project: &project,
                    card_type: card_type_arg(args)?,
                    user: str_arg(args, "user"),
                };
                let fields = object_arg(args, "fields")?;
                to_value(&commands::card_create(
                    ctx,
                    target,
                    fields,
                    bool_arg(args, "validateOnly"),
                )?)
            }
            "update_card" => {
                let project = ctx.project_id(str_arg(args, "project"))?;
                let target = CardTarget {
                    project: &project,
                    card_type: card_type_arg(args)?,
                    user: str_arg(args, "user"),
                };
                let id = required_str(args, "id")?;
                let updates = object_arg(args, "updates")?;
                to_value(&commands::card_update(
                    ctx,
                    target,
                    id,
                    updates,
                    bool_arg(args, "validateOnly"),
                )?)
            }
            "get_card" => {
                let project = ctx.project_id(str_arg(args, "project"))?;
                let view = commands::card_show(
                    ctx,
                    &project,
                    card_type_arg(args)?,
                    required_str(args, "id")?,
                )?;
                to_value(&view)
            }
            "get_transition_rules" => to_value(&commands::rules(card_type_arg(args)?)),
            "get_available_transitions" => {
                let project = ctx.project_id(str_arg(args, "project"))?;
                let transitions = commands::card_transitions(
                    ctx,
                    &project,
                    card_type_arg(args)?,
                    required_str(args, "id")?,
                )?;
                to_value(&transitions)
            }
            "calculate_priority" => {
                let explicit = match str_arg(args, "scale") {
                    Some(raw) => Some(PointScale::parse(raw).ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "Invalid scale '{}': expected 1-5 or fibonacci",
                            raw
                        ))
                    })?),
                    None => None,
                };
                let scale = commands::priority_scale(ctx, explicit, str_arg(args, "project"))?;
                to_value(&commands::priority_calc(
                    u32_arg(args, "businessPoints")?,
                    u32_arg(args, "devPoints")?,
                    scale,
                )?)
            }
            "list_vocabulary" => {
                let kind: ListKind = required_str(args, "kind")?.parse()?;
                to_value(&commands::lists_show(ctx, kind)?)
            }
            "invalidate_vocabulary" => {
                let kind = str_arg(args, "kind")
                    .map(str::parse::<ListKind>)
                    .transpose()?;
                to_value(&commands::lists_invalidate(ctx, kind))
            }
            _ => Err(Error::InvalidInput(format!("Unknown tool: {}", name))),
        }
    }
}

/// Start the MCP stdio server. Returns when stdin closes.
pub fn serve(ctx: Context) -> Result<()> {
    let mut server = McpServer::new(ctx);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    tracing::info!("mcp server listening on stdio");

    for line in stdin.lock().lines() {
        let line = line?;
        if let Some(response) = server.handle_line(&line) {
            writeln!(stdout, "{}", response)?;
            stdout.flush()?;
        }
    }
    tracing::info!("mcp server stdin closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CardflowConfig, ConfigOverrides, resolve_layers};
    use tempfile::TempDir;

    fn server(temp: &TempDir) -> McpServer {
        let config = resolve_layers(
            &CardflowConfig::default(),
            &CardflowConfig {
                default_project: Some("Planning".into()),
                ..Default::default()
            },
            &ConfigOverrides::new().with_user("agent"),
        );
        let ctx = Context::new(temp.path(), config);
        commands::system_init(&ctx).unwrap();
        commands::project_create(
            &ctx,
            commands::ProjectInput {
                id: "Planning".into(),
                ..Default::default()
            },
        )
        .unwrap();
        McpServer::new(ctx)
    }

    fn call(server: &mut McpServer, name: &str, args: Value) -> Value {
        let line = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": name, "arguments": args}
        })
        .to_string();
        server.handle_line(&line).unwrap()
    }

    fn content(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_manifest_lists_every_tool() {
        let names: Vec<&str> = tool_definitions().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "create_card",
                "update_card",
                "get_card",
                "get_transition_rules",
                "get_available_transitions",
                "calculate_priority",
                "list_vocabulary",
                "invalidate_vocabulary"
            ]
        );
        assert!(manifest()["tools"][0]["inputSchema"].is_object());
    }

    #[test]
    fn test_initialize_echoes_protocol_version() {
        let temp = TempDir::new().unwrap();
        let mut server = server(&temp);
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#)
            .unwrap();
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .is_none()
        );
    }

    #[test]
    fn test_protocol_errors() {
        let temp = TempDir::new().unwrap();
        let mut server = server(&temp);
        let parse = server.handle_line("{not json").unwrap();
        assert_eq!(parse["error"]["code"], PARSE_ERROR);

        let unknown = server
            .handle_line(r#"{"jsonrpc":"2.0","id":3,"method":"resources/subscribe"}"#)
            .unwrap();
        assert_eq!(unknown["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(unknown["id"], 3);

        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#)
                .is_none()
        );
    }

    #[test]
    fn test_tool_failure_is_structured() {
        let temp = TempDir::new().unwrap();
        let mut server = server(&temp);
        let response = call(
            &mut server,
            "create_card",
            json!({"cardType": "task", "fields": {"title": "No epic"}}),
        );
        assert_eq!(response["result"]["isError"], true);
        let body = content(&response);
        assert_eq!(body["violation"]["kind"], "EpicRequired");
    }

    #[test]
    fn test_validate_only_reports_without_error() {
        let temp = TempDir::new().unwrap();
        let mut server = server(&temp);
        let response = call(
            &mut server,
            "create_card",
            json!({"cardType": "task", "fields": {"title": "No epic", "priority": 2}, "validateOnly": true}),
        );
        assert_eq!(response["result"]["isError"], false);
        let body = content(&response);
        assert_eq!(body["valid"], false);
        let kinds: Vec<&str> = body["violations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v["kind"].as_str())
            .collect();
        assert!(kinds.contains(&"EpicRequired"));
        assert!(kinds.contains(&"DirectPriorityNotAllowed"));
    }

    #[test]
    fn test_introspection_tools() {
        let temp = TempDir::new().unwrap();
        let mut server = server(&temp);

        let rules = content(&call(&mut server, "get_transition_rules", json!({"cardType": "bug"})));
        assert_eq!(rules["initialStatus"], "Created");

        let priority = content(&call(
            &mut server,
            "calculate_priority",
            json!({"businessPoints": 5, "devPoints": 1}),
        ));
        assert_eq!(priority["priority"], 1);

        let list = content(&call(&mut server, "list_vocabulary", json!({"kind": "bugPriority"})));
        assert_eq!(list["values"][0], "Application Blocker");

        let bad = call(&mut server, "list_vocabulary", json!({"kind": "severity"}));
        assert_eq!(bad["result"]["isError"], true);

        let unknown = call(&mut server, "delete_card", json!({}));
        assert_eq!(unknown["result"]["isError"], true);
    }
}
