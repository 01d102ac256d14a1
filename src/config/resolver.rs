//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Data-dir config.kdl (`{data_dir}/config.kdl`)
//! 3. System config.kdl (`~/.config/cardflow/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::schema::{CONFIG_FILE, CardflowConfig, OutputFormat};
use crate::lookup::DEFAULT_TTL;
use crate::models::PointScale;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "CF_CONFIG_DIR";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from the data directory's config.kdl
    DataDir,
    /// Value from the system config.kdl
    System,
    /// Value from an environment variable
    EnvVar(String),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::DataDir => write!(f, "data-dir"),
            ValueSource::System => write!(f, "system"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedConfig {
    pub default_project: Option<Resolved<String>>,
    pub priority_scale: Resolved<PointScale>,
    pub vocabulary_ttl_secs: Resolved<u64>,
    pub output_format: Resolved<OutputFormat>,
    pub action_log: Resolved<bool>,
    pub user: Resolved<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            default_project: None,
            priority_scale: Resolved::new(PointScale::default(), ValueSource::Default),
            vocabulary_ttl_secs: Resolved::new(DEFAULT_TTL.as_secs(), ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
            user: default_user(),
        }
    }
}

fn default_user() -> Resolved<String> {
    match std::env::var("USER").ok().filter(|u| !u.trim().is_empty()) {
        Some(user) => Resolved::new(user, ValueSource::EnvVar("USER".to_string())),
        None => Resolved::new("unknown".to_string(), ValueSource::Default),
    }
}

impl ResolvedConfig {
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_ref().map(|r| r.value.as_str())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn vocabulary_ttl(&self) -> Duration {
        Duration::from_secs(self.vocabulary_ttl_secs.value)
    }

    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }

    pub fn user(&self) -> &str {
        &self.user.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub default_project: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub user: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = Some(project.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Location of the system-wide config.kdl.
///
/// `CF_CONFIG_DIR` wins; otherwise `~/.config/cardflow/config.kdl` (or the
/// platform equivalent).
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }
    }
    dirs::config_dir().map(|dir| dir.join("cardflow").join(CONFIG_FILE))
}

/// Location of the data directory's config.kdl.
pub fn data_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

fn pick<T: Clone>(
    cli: Option<&T>,
    data: Option<&T>,
    system: Option<&T>,
) -> Option<Resolved<T>> {
    if let Some(v) = cli {
        Some(Resolved::new(v.clone(), ValueSource::CliFlag))
    } else if let Some(v) = data {
        Some(Resolved::new(v.clone(), ValueSource::DataDir))
    } else {
        system.map(|v| Resolved::new(v.clone(), ValueSource::System))
    }
}

/// Resolve configuration from already-loaded layers.
pub fn resolve_layers(
    system: &CardflowConfig,
    data: &CardflowConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    result.default_project = pick(
        overrides.default_project.as_ref(),
        data.default_project.as_ref(),
        system.default_project.as_ref(),
    );
    if let Some(scale) = pick(None, data.priority_scale.as_ref(), system.priority_scale.as_ref()) {
        result.priority_scale = scale;
    }
    if let Some(ttl) = pick(
        None,
        data.vocabulary_ttl_secs.as_ref(),
        system.vocabulary_ttl_secs.as_ref(),
    ) {
        result.vocabulary_ttl_secs = ttl;
    }
    if let Some(format) = pick(
        overrides.output_format.as_ref(),
        data.output_format.as_ref(),
        system.output_format.as_ref(),
    ) {
        result.output_format = format;
    }
    if let Some(enabled) = pick(None, data.action_log.as_ref(), system.action_log.as_ref()) {
        result.action_log = enabled;
    }
    if let Some(user) = pick(overrides.user.as_ref(), data.user.as_ref(), system.user.as_ref()) {
        result.user = user;
    }

    result
}

/// Resolve configuration with the full precedence chain.
pub fn resolve_config(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => CardflowConfig::load(&path)?,
        None => CardflowConfig::new(),
    };
    let data = CardflowConfig::load(&data_config_path(data_dir))?;
    Ok(resolve_layers(&system, &data, overrides))
}
