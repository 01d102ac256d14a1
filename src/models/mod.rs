//! Data models for cardflow entities.
//!
//! Card records themselves are JSON documents (see [`Document`]) because
//! updates arrive as partial objects and malformed sub-documents must be
//! reported field by field rather than rejected by a deserializer. This
//! module defines the typed vocabulary around them:
//! - `CardType` - task, bug, epic, sprint, proposal, QA item
//! - `TaskStatus` / `BugStatus` - workflow labels with fixed transition tables
//! - `PointScale` - ordinal scales used for effort and business value
//! - `Commit`, `AcceptanceScenario`, `DescriptionItem` - nested records
//! - [`plan`] - the implementation plan sub-document
//! - [`directory`] - projects and the people referenced by cards

pub mod directory;
pub mod plan;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use directory::{Identity, Person, Project};
pub use plan::{ImplementationPlan, PlanStatus, PlanStep, StepStatus};

/// A stored record: a JSON object with camelCase keys.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Record keys that never change once a card exists.
pub const PROTECTED_FIELDS: &[&str] = &["cardId", "cardType", "projectId", "createdAt", "createdBy"];

/// Kind of card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Task,
    Bug,
    Epic,
    Sprint,
    Proposal,
    Qa,
}

impl CardType {
    /// Get all card types.
    pub fn all() -> &'static [CardType] {
        &[
            CardType::Task,
            CardType::Bug,
            CardType::Epic,
            CardType::Sprint,
            CardType::Proposal,
            CardType::Qa,
        ]
    }

    /// Three-character code used in card ids (`PLN-TSK-0007`).
    pub fn abbreviation(&self) -> &'static str {
        match self {
            CardType::Task => "TSK",
            CardType::Bug => "BUG",
            CardType::Epic => "EPC",
            CardType::Sprint => "SPR",
            CardType::Proposal => "PRP",
            CardType::Qa => "_QA",
        }
    }

    /// Storage collection name under `cards/{project}/`.
    pub fn collection(&self) -> &'static str {
        match self {
            CardType::Task => "tasks",
            CardType::Bug => "bugs",
            CardType::Epic => "epics",
            CardType::Sprint => "sprints",
            CardType::Proposal => "proposals",
            CardType::Qa => "qa",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Task => "task",
            CardType::Bug => "bug",
            CardType::Epic => "epic",
            CardType::Sprint => "sprint",
            CardType::Proposal => "proposal",
            CardType::Qa => "qa",
        }
    }

    /// Status a new card starts in, for types with a workflow.
    pub fn initial_status(&self) -> Option<&'static str> {
        match self {
            CardType::Task => Some(TaskStatus::ToDo.as_str()),
            CardType::Bug => Some(BugStatus::Created.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CardType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" | "tasks" => Ok(CardType::Task),
            "bug" | "bugs" => Ok(CardType::Bug),
            "epic" | "epics" => Ok(CardType::Epic),
            "sprint" | "sprints" => Ok(CardType::Sprint),
            "proposal" | "proposals" => Ok(CardType::Proposal),
            "qa" => Ok(CardType::Qa),
            _ => Err(format!(
                "Unknown card type: {} (expected task, bug, epic, sprint, proposal or qa)",
                s
            )),
        }
    }
}

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    ToDo,
    InProgress,
    ToValidate,
    /// Approval status; only a validator workflow may set it.
    DoneValidated,
    Blocked,
    Reopened,
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::ToDo,
            TaskStatus::InProgress,
            TaskStatus::ToValidate,
            TaskStatus::DoneValidated,
            TaskStatus::Blocked,
            TaskStatus::Reopened,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::ToValidate => "To Validate",
            TaskStatus::DoneValidated => "Done&Validated",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Reopened => "Reopened",
        }
    }

    /// Parse a canonical label. Matching is exact; canonicalization is the
    /// lookup service's job.
    pub fn parse(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.as_str() == label)
    }

    /// Parse a stored label, tolerating case differences in legacy records.
    pub fn parse_loose(label: &str) -> Option<Self> {
        Self::parse(label).or_else(|| {
            Self::all()
                .iter()
                .copied()
                .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
        })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bug workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BugStatus {
    Created,
    Assigned,
    Fixed,
    Verified,
    Closed,
}

impl BugStatus {
    pub fn all() -> &'static [BugStatus] {
        &[
            BugStatus::Created,
            BugStatus::Assigned,
            BugStatus::Fixed,
            BugStatus::Verified,
            BugStatus::Closed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BugStatus::Created => "Created",
            BugStatus::Assigned => "Assigned",
            BugStatus::Fixed => "Fixed",
            BugStatus::Verified => "Verified",
            BugStatus::Closed => "Closed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordinal point scale for effort and business value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointScale {
    /// 1, 2, 3, 4, 5
    #[default]
    #[serde(rename = "1-5")]
    Linear,
    /// 1, 2, 3, 5, 8, 13
    #[serde(rename = "fibonacci")]
    Fibonacci,
}

impl PointScale {
    pub fn values(&self) -> &'static [u32] {
        match self {
            PointScale::Linear => &[1, 2, 3, 4, 5],
            PointScale::Fibonacci => &[1, 2, 3, 5, 8, 13],
        }
    }

    pub fn contains(&self, points: u32) -> bool {
        self.values().contains(&points)
    }

    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1-5" | "linear" | "five" => Some(PointScale::Linear),
            "fibonacci" | "fib" => Some(PointScale::Fibonacci),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointScale::Linear => "1-5",
            PointScale::Fibonacci => "fibonacci",
        }
    }
}

impl fmt::Display for PointScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A commit attached to a card. Identity is the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub date: String,
    pub author: String,
}

/// One acceptance scenario, either Given/When/Then or a raw sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceScenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl AcceptanceScenario {
    /// True when at least one field carries text.
    pub fn has_content(&self) -> bool {
        [&self.given, &self.when, &self.then, &self.raw]
            .iter()
            .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// A user-story triple from `descriptionStructured`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionItem {
    pub role: String,
    pub goal: String,
    pub benefit: String,
}
