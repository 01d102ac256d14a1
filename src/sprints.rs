//! Sprint resolution for task transitions.
//!
//! A project's active sprint is the first sprint (stored order) carrying an
//! active-like status label; failing that, the first whose date range
//! contains today.

use crate::Result;
use crate::engine::{Violation, ViolationKind};
use crate::models::{CardType, Document};
use crate::storage::{self, DocumentStore};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Status labels that mark a sprint as active.
pub const ACTIVE_LABELS: &[&str] = &["Active", "In Progress"];

/// The parts of a sprint record the resolver cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
    pub key: String,
    pub card_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SprintSummary {
    pub fn from_record(key: &str, doc: &Document) -> Self {
        let text = |field: &str| {
            doc.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            key: key.to_string(),
            card_id: text("cardId").unwrap_or_else(|| key.to_string()),
            title: text("title").unwrap_or_default(),
            status: text("status"),
            start_date: text("startDate"),
            end_date: text("endDate"),
        }
    }

    pub fn is_active_labelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| ACTIVE_LABELS.iter().any(|l| l.eq_ignore_ascii_case(s)))
    }

    /// True when `day` falls inside `[startDate, endDate]`, both inclusive.
    ///
    /// Dates are `YYYY-MM-DD`, so string comparison orders them correctly.
    pub fn contains_date(&self, day: &str) -> bool {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => start.as_str() <= day && day <= end.as_str(),
            _ => false,
        }
    }

    /// Either the card id or the storage key names this sprint.
    pub fn matches(&self, reference: &str) -> bool {
        self.card_id == reference || self.key == reference
    }

    fn label(&self) -> String {
        if self.title.is_empty() {
            self.card_id.clone()
        } else {
            format!("{} ({})", self.card_id, self.title)
        }
    }
}

/// All sprints of a project in stored order.
pub fn load_sprints<S: DocumentStore + ?Sized>(
    store: &S,
    project_id: &str,
) -> Result<Vec<SprintSummary>> {
    Ok(store
        .list(&storage::cards_path(project_id, CardType::Sprint))?
        .iter()
        .map(|(key, doc)| SprintSummary::from_record(key, doc))
        .collect())
}

/// Pick the active sprint out of `sprints` for `today`.
pub fn pick_active_sprint(sprints: &[SprintSummary], today: NaiveDate) -> Option<&SprintSummary> {
    let day = today.format("%Y-%m-%d").to_string();
    sprints
        .iter()
        .find(|s| s.is_active_labelled())
        .or_else(|| sprints.iter().find(|s| s.contains_date(&day)))
}

pub fn find_active_sprint<S: DocumentStore + ?Sized>(
    store: &S,
    project_id: &str,
    today: NaiveDate,
) -> Result<Option<SprintSummary>> {
    let sprints = load_sprints(store, project_id)?;
    let active = pick_active_sprint(&sprints, today).cloned();
    tracing::debug!(
        project = project_id,
        sprint = active.as_ref().map(|s| s.card_id.as_str()),
        "active sprint resolved"
    );
    Ok(active)
}

/// Check a sprint reference against the project's sprints.
///
/// `None` and blank references pass.
pub fn sprint_violation(sprints: &[SprintSummary], reference: Option<&str>) -> Option<Violation> {
    let reference = reference.map(str::trim).filter(|r| !r.is_empty())?;
    if sprints.is_empty() {
        return Some(
            Violation::new(
                ViolationKind::NoSprintsInProject,
                format!(
                    "Sprint '{}' cannot be used: the project has no sprints. Create a sprint first",
                    reference
                ),
            )
            .with_field("sprint")
            .with_actual(reference),
        );
    }
    if sprints.iter().any(|s| s.matches(reference)) {
        return None;
    }
    let known: Vec<String> = sprints.iter().map(SprintSummary::label).collect();
    Some(
        Violation::new(
            ViolationKind::SprintNotFound,
            format!(
                "Sprint '{}' not found. Available sprints: {}",
                reference,
                known.join(", ")
            ),
        )
        .with_field("sprint")
        .with_expected(known)
        .with_actual(reference),
    )
}

/// Check a raw `sprint` field. Only strings name a sprint; `null` clears it.
pub fn sprint_value_violation(sprints: &[SprintSummary], value: &Value) -> Option<Violation> {
    let other = match value {
        Value::Null => return None,
        Value::String(reference) => return sprint_violation(sprints, Some(reference)),
        other => other,
    };
    let known: Vec<String> = sprints.iter().map(SprintSummary::label).collect();
    let available = if known.is_empty() {
        "none".to_string()
    } else {
        known.join(", ")
    };
    Some(
        Violation::new(
            ViolationKind::SprintNotFound,
            format!(
                "Sprint must be a sprint id, got {}. Available sprints: {}",
                other, available
            ),
        )
        .with_field("sprint")
        .with_expected(known)
        .with_actual(other.clone()),
    )
}

pub fn validate_sprint_exists<S: DocumentStore + ?Sized>(
    store: &S,
    project_id: &str,
    reference: Option<&str>,
) -> Result<()> {
    if reference.is_none_or(|r| r.trim().is_empty()) {
        return Ok(());
    }
    let sprints = load_sprints(store, project_id)?;
    match sprint_violation(&sprints, reference) {
        Some(v) => Err(v.into()),
        None => Ok(()),
    }
}
