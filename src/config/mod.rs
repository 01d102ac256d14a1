//! Configuration for cardflow.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/cardflow/config.kdl` (or `$CF_CONFIG_DIR/config.kdl`)
//! - Data dir: `{data_dir}/config.kdl`
//!
//! Contains:
//! - `default-project` - Project used when `--project` is omitted
//! - `priority-scale` - "1-5" or "fibonacci" for projects without a scoring system
//! - `vocabulary-ttl-secs` - Vocabulary cache lifetime
//! - `output-format` - "json" or "human"
//! - `action-log` - Whether commands are logged
//! - `user` - Name recorded on cards
//!
//! ## Precedence
//!
//! CLI flag > data-dir config > system config > defaults.
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, ConfigOverrides, Resolved, ResolvedConfig, ValueSource, data_config_path,
    resolve_config, resolve_layers, system_config_path,
};
pub use schema::{CONFIG_FILE, CONFIG_KEYS, CardflowConfig, OutputFormat};
