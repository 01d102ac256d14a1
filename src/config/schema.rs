//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the schema
//! - Serialization/deserialization to/from KDL format
//! - Validation and per-key updates for `cf config set`
//! - File helpers

use crate::models::PointScale;
use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name used at every config level.
pub const CONFIG_FILE: &str = "config.kdl";

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: &[&str] = &[
    "default-project",
    "priority-scale",
    "vocabulary-ttl-secs",
    "output-format",
    "action-log",
    "user",
];

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// default-project "Planning"
/// priority-scale "fibonacci"   // or "1-5"
/// vocabulary-ttl-secs 300
/// output-format "human"        // or "json"
/// action-log #true
/// user "ada"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardflowConfig {
    /// Project used when a command omits `--project`
    pub default_project: Option<String>,

    /// Scale for projects that do not set `scoringSystem`
    pub priority_scale: Option<PointScale>,

    /// How long vocabulary lists stay cached
    pub vocabulary_ttl_secs: Option<u64>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Whether commands are appended to the action log
    pub action_log: Option<bool>,

    /// Name recorded in createdBy/updatedBy
    pub user: Option<String>,
}

fn first_value<'a>(doc: &'a KdlDocument, key: &str) -> Option<&'a KdlValue> {
    doc.get(key)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn string_node(key: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(key);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}

impl CardflowConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ttl) = self.vocabulary_ttl_secs {
            if ttl == 0 {
                return Err("vocabulary-ttl-secs must be greater than 0".to_string());
            }
        }
        if let Some(project) = &self.default_project {
            if project.trim().is_empty() {
                return Err("default-project must not be blank".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown keys and values of the
    /// wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let text = |key: &str| {
            first_value(doc, key)
                .and_then(KdlValue::as_string)
                .map(str::to_string)
        };
        Self {
            default_project: text("default-project"),
            priority_scale: text("priority-scale").and_then(|s| PointScale::parse(&s)),
            vocabulary_ttl_secs: first_value(doc, "vocabulary-ttl-secs")
                .and_then(KdlValue::as_integer)
                .and_then(|i| u64::try_from(i).ok())
                .filter(|ttl| *ttl > 0),
            output_format: text("output-format").and_then(|s| OutputFormat::parse(&s)),
            action_log: first_value(doc, "action-log").and_then(KdlValue::as_bool),
            user: text("user"),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let nodes = doc.nodes_mut();

        if let Some(ref project) = self.default_project {
            nodes.push(string_node("default-project", project));
        }
        if let Some(scale) = self.priority_scale {
            nodes.push(string_node("priority-scale", scale.as_str()));
        }
        if let Some(ttl) = self.vocabulary_ttl_secs {
            let mut node = KdlNode::new("vocabulary-ttl-secs");
            node.push(KdlEntry::new(KdlValue::Integer(i128::from(ttl))));
            nodes.push(node);
        }
        if let Some(format) = self.output_format {
            nodes.push(string_node("output-format", format.as_str()));
        }
        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            nodes.push(node);
        }
        if let Some(ref user) = self.user {
            nodes.push(string_node("user", user));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &CardflowConfig) {
        if other.default_project.is_some() {
            self.default_project = other.default_project.clone();
        }
        if other.priority_scale.is_some() {
            self.priority_scale = other.priority_scale;
        }
        if other.vocabulary_ttl_secs.is_some() {
            self.vocabulary_ttl_secs = other.vocabulary_ttl_secs;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
        if other.user.is_some() {
            self.user = other.user.clone();
        }
    }

    /// Set one key from its command-line text form.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |expected: &str| {
            Error::Config(format!(
                "Invalid value '{}' for {}: expected {}",
                value, key, expected
            ))
        };
        match key {
            "default-project" => self.default_project = Some(value.to_string()),
            "priority-scale" => {
                self.priority_scale =
                    Some(PointScale::parse(value).ok_or_else(|| invalid("1-5 or fibonacci"))?)
            }
            "vocabulary-ttl-secs" => {
                let ttl: u64 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid("a positive number of seconds"))?;
                self.vocabulary_ttl_secs = Some(ttl);
            }
            "output-format" => {
                self.output_format =
                    Some(OutputFormat::parse(value).ok_or_else(|| invalid("json or human"))?)
            }
            "action-log" => {
                self.action_log = Some(match value.trim().to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid("true or false")),
                })
            }
            "user" => self.user = Some(value.to_string()),
            _ => {
                return Err(Error::Config(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        self.validate().map_err(Error::Config)
    }

    /// Read a config file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_kdl(&doc))
    }

    /// Write the config file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        let config = CardflowConfig::from_kdl(&doc);
        assert_eq!(config, CardflowConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            default-project "Planning"
            priority-scale "fibonacci"
            vocabulary-ttl-secs 60
            output-format "human"
            action-log #false
            user "ada"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = CardflowConfig::from_kdl(&doc);

        assert_eq!(config.default_project.as_deref(), Some("Planning"));
        assert_eq!(config.priority_scale, Some(PointScale::Fibonacci));
        assert_eq!(config.vocabulary_ttl_secs, Some(60));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.action_log, Some(false));
        assert_eq!(config.user.as_deref(), Some("ada"));
    }

    #[test]
    fn test_config_ignores_bad_values() {
        let kdl = r#"
            priority-scale "t-shirt"
            vocabulary-ttl-secs -5
            output-format 3
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        assert_eq!(CardflowConfig::from_kdl(&doc), CardflowConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = CardflowConfig {
            default_project: Some("Planning".to_string()),
            priority_scale: Some(PointScale::Linear),
            vocabulary_ttl_secs: Some(120),
            output_format: Some(OutputFormat::Json),
            action_log: Some(true),
            user: Some("grace".to_string()),
        };
        let doc: KdlDocument = config.to_kdl().to_string().parse().unwrap();
        assert_eq!(CardflowConfig::from_kdl(&doc), config);
    }

    #[test]
    fn test_config_merge() {
        let mut base = CardflowConfig {
            default_project: Some("A".to_string()),
            user: Some("ada".to_string()),
            ..Default::default()
        };
        let other = CardflowConfig {
            default_project: Some("B".to_string()),
            action_log: Some(false),
            ..Default::default()
        };
        base.merge(&other);
        assert_eq!(base.default_project.as_deref(), Some("B"));
        assert_eq!(base.user.as_deref(), Some("ada"));
        assert_eq!(base.action_log, Some(false));
    }

    #[test]
    fn test_set_key() {
        let mut config = CardflowConfig::new();
        config.set_key("priority-scale", "fib").unwrap();
        config.set_key("action-log", "off").unwrap();
        config.set_key("vocabulary-ttl-secs", "30").unwrap();
        assert_eq!(config.priority_scale, Some(PointScale::Fibonacci));
        assert_eq!(config.action_log, Some(false));
        assert_eq!(config.vocabulary_ttl_secs, Some(30));

        assert!(config.set_key("vocabulary-ttl-secs", "0").is_err());
        assert!(config.set_key("output-format", "yaml").is_err());
        let err = config.set_key("editor", "vim").unwrap_err();
        assert!(err.to_string().contains("default-project"));
    }

    #[test]
    fn test_load_and_save() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE);
        assert_eq!(CardflowConfig::load(&path).unwrap(), CardflowConfig::default());

        let mut config = CardflowConfig::new();
        config.set_key("default-project", "Planning").unwrap();
        config.save(&path).unwrap();
        assert_eq!(CardflowConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_malformed_kdl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "default-project \"unterminated").unwrap();
        assert!(matches!(CardflowConfig::load(&path), Err(Error::Config(_))));
    }
}
