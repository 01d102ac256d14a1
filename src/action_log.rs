//! Audit log of executed `cf` commands.
//!
//! Each invocation appends one JSON line to `{data_dir}/action.log`.
//! Writing is best effort: a failure is reported through `tracing` and the
//! command result is unaffected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the action log inside the data directory.
pub const ACTION_LOG_FILE: &str = "action.log";

const MAX_STRING_LEN: usize = 200;
const MAX_ARRAY_LEN: usize = 20;
const SENSITIVE_MARKERS: &[&str] = &["password", "token", "secret", "credential"];

/// One line of the action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub timestamp: DateTime<Utc>,

    /// Command path, e.g. "card update" or "mcp serve"
    pub command: String,

    pub args: Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    pub user: String,
}

impl ActionLog {
    pub fn new(command: impl Into<String>, args: &Value, user: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            command: command.into(),
            args: sanitize_args(args),
            success: true,
            error: None,
            duration_ms: 0,
            user: user.into(),
        }
    }

    /// Record the outcome of the command.
    pub fn finish(mut self, error: Option<String>, duration_ms: u64) -> Self {
        self.success = error.is_none();
        self.error = error;
        self.duration_ms = duration_ms;
        self
    }
}

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ACTION_LOG_FILE)
}

/// Append `entry` to the data directory's action log.
///
/// Never fails; problems are logged as warnings.
pub fn log_action(data_dir: &Path, entry: &ActionLog) {
    let path = log_path(data_dir);
    if let Err(e) = write_log_entry(&path, entry) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Read every entry of the log, skipping lines that do not parse.
pub fn read_log(data_dir: &Path) -> std::io::Result<Vec<ActionLog>> {
    let path = log_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

/// Redact secrets and shrink oversized values.
pub fn sanitize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_MARKERS.iter().any(|m| lower.contains(m)) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), sanitize_args(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) if items.len() > MAX_ARRAY_LEN => {
            Value::String(format!("[Array with {} items]", items.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_args).collect()),
        Value::String(s) if s.chars().count() > MAX_STRING_LEN => {
            let head: String = s.chars().take(MAX_STRING_LEN - 3).collect();
            Value::String(format!("{}... ({} chars)", head, s.chars().count()))
        }
        _ => args.clone(),
    }
}
