//! Implementation plan sub-document attached to tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan progression: pending → proposed → validated → in_progress → completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Pending,
    Proposed,
    Validated,
    InProgress,
    Completed,
}

impl PlanStatus {
    pub fn all() -> &'static [PlanStatus] {
        &[
            PlanStatus::Pending,
            PlanStatus::Proposed,
            PlanStatus::Validated,
            PlanStatus::InProgress,
            PlanStatus::Completed,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Proposed => "proposed",
            PlanStatus::Validated => "validated",
            PlanStatus::InProgress => "in_progress",
            PlanStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single plan step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Skipped,
}

impl StepStatus {
    pub fn all() -> &'static [StepStatus] {
        &[
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Done,
            StepStatus::Skipped,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Done => "done",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|p| p.as_str() == s)
    }
}

/// One step of an implementation plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,

    /// Extra keys (files touched, notes, ...) preserved as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Structured implementation plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPlan {
    pub approach: String,

    #[serde(default)]
    pub steps: Vec<PlanStep>,

    #[serde(default)]
    pub data_model_changes: String,

    #[serde(default)]
    pub api_changes: String,

    #[serde(default)]
    pub risks: String,

    #[serde(default)]
    pub out_of_scope: String,

    #[serde(default)]
    pub plan_status: PlanStatus,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImplementationPlan {
    /// Wrap a legacy free-text plan as a proposed structured plan.
    pub fn from_legacy_text(text: &str) -> Self {
        Self {
            approach: text.to_string(),
            plan_status: PlanStatus::Proposed,
            ..Default::default()
        }
    }

    /// Move the plan forward to `target`. Never moves it backwards.
    ///
    /// Returns true when the status changed.
    pub fn advance_to(&mut self, target: PlanStatus) -> bool {
        if target > self.plan_status {
            self.plan_status = target;
            true
        } else {
            false
        }
    }
}
