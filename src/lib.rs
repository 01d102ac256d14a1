//! Cardflow - card lifecycle and validation engine for project boards.
//!
//! This library provides the core functionality for the `cf` CLI tool:
//! status state machines for tasks and bugs, derived priority, transition
//! gates, reference resolution, and validation of structured sub-documents.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod directory;
pub mod engine;
pub mod lookup;
pub mod mcp;
pub mod models;
pub mod priority;
pub mod references;
pub mod sprints;
pub mod storage;
pub mod subdocs;

pub use engine::{Violation, ViolationKind};


/// Library-level error type for cardflow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `cf system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown list kind: {0} (expected one of taskStatus, bugStatus, bugPriority)")]
    UnknownListKind(String),

    #[error("Vocabulary list '{0}' is missing or empty; seed it with `cf system init`")]
    EmptyVocabularySource(String),

    /// A mutation was refused by a validation rule.
    #[error("{0}")]
    Rejected(Violation),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The violation behind a rejection, if this error is one.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::Rejected(v) => Some(v),
            _ => None,
        }
    }

    /// JSON error body: the message, plus the structured violation for
    /// rejections.
    pub fn to_json(&self) -> serde_json::Value {
        match self.violation() {
            Some(v) => serde_json::json!({ "error": self.to_string(), "violation": v }),
            None => serde_json::json!({ "error": self.to_string() }),
        }
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::Rejected(v)
    }
}

/// Result type alias for cardflow operations.
pub type Result<T> = std::result::Result<T, Error>;
