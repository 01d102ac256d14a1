//! Transition tables and required-field gates.

use crate::models::{BugStatus, CardType, Document, TaskStatus};
use crate::subdocs;
use serde::Serialize;
use serde_json::Value;

/// Fields every task needs before it leaves `To Do`.
pub const BASE_REQUIRED_FIELDS: &[&str] = &[
    "title",
    "developer",
    "validator",
    "epic",
    "sprint",
    "devPoints",
    "businessPoints",
    "acceptanceCriteria",
];

/// Extra fields for entering `To Validate`.
pub const TO_VALIDATE_FIELDS: &[&str] = &["startDate", "commits"];

/// Fields a bug needs on the merged record before it can be closed.
pub const BUG_CLOSE_FIELDS: &[&str] = &["commits", "rootCause", "resolution"];

/// Placeholder reported when neither block flag is raised.
pub const BLOCK_FLAG: &str = "blockedByBusiness|blockedByDevelopment";

/// Block flags and the reason/owner pair each one requires.
pub const BLOCK_PAIRS: &[(&str, [&str; 2])] = &[
    ("blockedByBusiness", ["businessBlockReason", "businessBlockOwner"]),
    (
        "blockedByDevelopment",
        ["developmentBlockReason", "developmentBlockOwner"],
    ),
];

/// Statuses a task may move to from `from`.
pub fn task_targets(from: TaskStatus) -> &'static [TaskStatus] {
    match from {
        TaskStatus::ToDo => &[TaskStatus::InProgress, TaskStatus::Blocked],
        TaskStatus::InProgress => &[TaskStatus::ToValidate, TaskStatus::Blocked, TaskStatus::ToDo],
        TaskStatus::ToValidate => &[TaskStatus::Reopened],
        TaskStatus::DoneValidated => &[],
        TaskStatus::Blocked => &[TaskStatus::InProgress, TaskStatus::ToDo],
        TaskStatus::Reopened => &[TaskStatus::InProgress, TaskStatus::ToValidate],
    }
}

/// Whether `field` carries a usable value in `doc`.
///
/// Blank strings, empty lists and objects, zero, `false` and `null` count
/// as empty. `acceptanceCriteria` is also satisfied by structured scenarios
/// with content.
pub fn is_filled(doc: &Document, field: &str) -> bool {
    let filled = match doc.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(obj)) => !obj.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Bool(b)) => *b,
    };
    filled
        || (field == "acceptanceCriteria"
            && subdocs::has_acceptance_content(doc.get("acceptanceCriteriaStructured")))
}

fn missing_of<'a>(doc: &Document, fields: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    fields
        .into_iter()
        .filter(|f| !is_filled(doc, f))
        .map(str::to_string)
        .collect()
}

/// Fields of `doc` that block a move into `target`, in gate order.
pub fn missing_task_fields(target: TaskStatus, doc: &Document) -> Vec<String> {
    if target == TaskStatus::ToDo {
        return Vec::new();
    }
    let mut missing = missing_of(doc, BASE_REQUIRED_FIELDS.iter().copied());
    match target {
        TaskStatus::ToValidate => missing.extend(missing_of(doc, TO_VALIDATE_FIELDS.iter().copied())),
        TaskStatus::Blocked => {
            let raised: Vec<_> = BLOCK_PAIRS
                .iter()
                .filter(|(flag, _)| is_filled(doc, flag))
                .collect();
            if raised.is_empty() {
                missing.push(BLOCK_FLAG.to_string());
            }
            for (_, pair) in raised {
                missing.extend(missing_of(doc, pair.iter().copied()));
            }
        }
        _ => {}
    }
    missing
}

/// Documentation a bug still lacks for closing.
pub fn missing_bug_close_fields(doc: &Document) -> Vec<String> {
    missing_of(doc, BUG_CLOSE_FIELDS.iter().copied())
}

/// Outgoing transitions from one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEntry {
    pub from: &'static str,
    pub to: Vec<&'static str>,
}

/// Fields required for one transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequiredFieldsEntry {
    /// Source status, or `*` for any.
    pub from: &'static str,
    pub to: &'static str,
    pub fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Read-only description of a card type's workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRules {
    pub card_type: CardType,
    pub valid_statuses: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_status: Option<&'static str>,
    pub transition_table: Vec<TransitionEntry>,
    pub required_fields_per_transition: Vec<RequiredFieldsEntry>,
    /// Statuses only an approval workflow may set.
    pub validator_only: Vec<&'static str>,
    pub notes: Vec<&'static str>,
}

fn task_required_fields(target: TaskStatus) -> Vec<&'static str> {
    let mut fields = BASE_REQUIRED_FIELDS.to_vec();
    match target {
        TaskStatus::ToValidate => fields.extend_from_slice(TO_VALIDATE_FIELDS),
        TaskStatus::Blocked => fields.push(BLOCK_FLAG),
        _ => {}
    }
    fields
}

/// Workflow tables for `card_type`. Types without a workflow get empty tables.
pub fn transition_rules(card_type: CardType) -> TransitionRules {
    match card_type {
        CardType::Task => {
            let statuses = TaskStatus::all();
            let transition_table = statuses
                .iter()
                .map(|from| TransitionEntry {
                    from: from.as_str(),
                    to: task_targets(*from).iter().map(TaskStatus::as_str).collect(),
                })
                .collect();
            let required_fields_per_transition = statuses
                .iter()
                .flat_map(|from| task_targets(*from).iter().map(move |to| (*from, *to)))
                .filter(|(_, to)| *to != TaskStatus::ToDo)
                .map(|(from, to)| RequiredFieldsEntry {
                    from: from.as_str(),
                    to: to.as_str(),
                    fields: task_required_fields(to),
                    note: (to == TaskStatus::Blocked)
                        .then_some("each raised block flag needs its reason and owner"),
                })
                .collect();
            TransitionRules {
                card_type,
                valid_statuses: statuses.iter().map(TaskStatus::as_str).collect(),
                initial_status: card_type.initial_status(),
                transition_table,
                required_fields_per_transition,
                validator_only: vec![TaskStatus::DoneValidated.as_str()],
                notes: vec![
                    "acceptanceCriteria is satisfied by acceptanceCriteriaStructured with content",
                    "sprint is filled from the active sprint when a task leaves To Do without one",
                    "priority is derived from businessPoints and devPoints and cannot be set directly",
                    "startDate is set on entering In Progress, endDate on entering To Validate",
                ],
            }
        }
        CardType::Bug => {
            let statuses = BugStatus::all();
            let transition_table = statuses
                .iter()
                .map(|from| TransitionEntry {
                    from: from.as_str(),
                    to: statuses
                        .iter()
                        .filter(|to| *to != from)
                        .map(BugStatus::as_str)
                        .collect(),
                })
                .collect();
            TransitionRules {
                card_type,
                valid_statuses: statuses.iter().map(BugStatus::as_str).collect(),
                initial_status: card_type.initial_status(),
                transition_table,
                required_fields_per_transition: vec![RequiredFieldsEntry {
                    from: "*",
                    to: BugStatus::Closed.as_str(),
                    fields: BUG_CLOSE_FIELDS.to_vec(),
                    note: None,
                }],
                validator_only: Vec::new(),
                notes: vec!["bug stages are not ordered; only closing is gated"],
            }
        }
        _ => TransitionRules {
            card_type,
            valid_statuses: Vec::new(),
            initial_status: None,
            transition_table: Vec::new(),
            required_fields_per_transition: Vec::new(),
            validator_only: Vec::new(),
            notes: vec!["this card type has no status workflow"],
        },
    }
}

/// Whether one target status is reachable from a specific record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub status: &'static str,
    pub allowed: bool,
    pub missing_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTransitions {
    pub card_type: CardType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    pub targets: Vec<TargetStatus>,
}

fn status_of(card: &Document) -> Option<&str> {
    card.get("status").and_then(Value::as_str)
}

/// Evaluate every other status against `card` as it is stored.
///
/// Nothing is filled in: a missing sprint is reported even when the
/// project has an active one that an update would pick up.
pub fn available_transitions(card_type: CardType, card: &Document) -> AvailableTransitions {
    let current_status = status_of(card)
        .map(str::to_string)
        .or_else(|| card_type.initial_status().map(str::to_string));

    let targets = match card_type {
        CardType::Task => {
            let from = current_status
                .as_deref()
                .and_then(TaskStatus::parse_loose)
                .unwrap_or(TaskStatus::ToDo);
            TaskStatus::all()
                .iter()
                .filter(|to| **to != from)
                .map(|to| task_target(from, *to, card))
                .collect()
        }
        CardType::Bug => {
            let from = current_status.as_deref().and_then(BugStatus::parse);
            BugStatus::all()
                .iter()
                .filter(|to| Some(**to) != from)
                .map(|to| {
                    let missing_fields = if *to == BugStatus::Closed {
                        missing_bug_close_fields(card)
                    } else {
                        Vec::new()
                    };
                    let allowed = missing_fields.is_empty();
                    TargetStatus {
                        status: to.as_str(),
                        allowed,
                        reason: (!allowed).then(|| {
                            format!("closing needs: {}", missing_fields.join(", "))
                        }),
                        missing_fields,
                    }
                })
                .collect()
        }
        _ => Vec::new(),
    };

    AvailableTransitions {
        card_type,
        current_status,
        targets,
    }
}

fn task_target(from: TaskStatus, to: TaskStatus, card: &Document) -> TargetStatus {
    if to == TaskStatus::DoneValidated {
        return TargetStatus {
            status: to.as_str(),
            allowed: false,
            missing_fields: Vec::new(),
            reason: Some(format!(
                "only the validator approval workflow sets {}; move the task to {} instead",
                to,
                TaskStatus::ToValidate
            )),
        };
    }
    if !task_targets(from).contains(&to) {
        return TargetStatus {
            status: to.as_str(),
            allowed: false,
            missing_fields: Vec::new(),
            reason: Some(format!("not reachable from {}", from)),
        };
    }
    let missing_fields = missing_task_fields(to, card);
    let allowed = missing_fields.is_empty();
    TargetStatus {
        status: to.as_str(),
        allowed,
        reason: (!allowed).then(|| format!("missing: {}", missing_fields.join(", "))),
        missing_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::doc;
    use serde_json::json;

    fn ready_task() -> Document {
        doc(json!({
            "title": "Export",
            "status": "To Do",
            "developer": "dev_001",
            "validator": "stk_001",
            "epic": "PLN-EPC-0001",
            "sprint": "PLN-SPR-0001",
            "devPoints": 2,
            "businessPoints": 5,
            "acceptanceCriteria": "works"
        }))
    }

    #[test]
    fn test_base_gate() {
        let mut task = ready_task();
        assert!(missing_task_fields(TaskStatus::InProgress, &task).is_empty());

        task.remove("developer");
        task.insert("sprint".into(), json!(" "));
        task.insert("devPoints".into(), json!(0));
        assert_eq!(
            missing_task_fields(TaskStatus::InProgress, &task),
            vec!["developer", "sprint", "devPoints"]
        );
        assert!(missing_task_fields(TaskStatus::ToDo, &task).is_empty());
    }

    #[test]
    fn test_structured_acceptance_satisfies_gate() {
        let mut task = ready_task();
        task.remove("acceptanceCriteria");
        assert_eq!(
            missing_task_fields(TaskStatus::InProgress, &task),
            vec!["acceptanceCriteria"]
        );
        task.insert(
            "acceptanceCriteriaStructured".into(),
            json!([{"given": "a", "when": "b", "then": "c"}]),
        );
        assert!(missing_task_fields(TaskStatus::InProgress, &task).is_empty());
    }

    #[test]
    fn test_to_validate_gate() {
        let mut task = ready_task();
        assert_eq!(
            missing_task_fields(TaskStatus::ToValidate, &task),
            vec!["startDate", "commits"]
        );
        task.insert("startDate".into(), json!("2026-03-01"));
        task.insert("commits".into(), json!([]));
        assert_eq!(missing_task_fields(TaskStatus::ToValidate, &task), vec!["commits"]);
    }

    #[test]
    fn test_blocked_gate() {
        let mut task = ready_task();
        assert_eq!(missing_task_fields(TaskStatus::Blocked, &task), vec![BLOCK_FLAG]);

        task.insert("blockedByDevelopment".into(), json!(true));
        task.insert("developmentBlockReason".into(), json!("waiting on API"));
        assert_eq!(
            missing_task_fields(TaskStatus::Blocked, &task),
            vec!["developmentBlockOwner"]
        );
        task.insert("developmentBlockOwner".into(), json!("dev_002"));
        assert!(missing_task_fields(TaskStatus::Blocked, &task).is_empty());
    }

    #[test]
    fn test_bug_close_gate() {
        let bug = doc(json!({"commits": [{"hash": "a"}], "rootCause": "typo"}));
        assert_eq!(missing_bug_close_fields(&bug), vec!["resolution"]);
    }

    #[test]
    fn test_task_rules_table() {
        let rules = transition_rules(CardType::Task);
        assert_eq!(rules.valid_statuses.len(), 6);
        assert_eq!(rules.initial_status, Some("To Do"));
        let done = rules
            .transition_table
            .iter()
            .find(|e| e.from == "Done&Validated")
            .unwrap();
        assert!(done.to.is_empty());
        assert!(
            rules
                .transition_table
                .iter()
                .all(|e| !e.to.contains(&"Done&Validated"))
        );
        let to_validate = rules
            .required_fields_per_transition
            .iter()
            .find(|r| r.from == "In Progress" && r.to == "To Validate")
            .unwrap();
        assert!(to_validate.fields.contains(&"commits"));
        assert!(
            rules
                .required_fields_per_transition
                .iter()
                .all(|r| r.to != "To Do")
        );
    }

    #[test]
    fn test_bug_and_plain_rules() {
        let rules = transition_rules(CardType::Bug);
        assert_eq!(rules.transition_table.len(), 5);
        assert_eq!(rules.required_fields_per_transition[0].to, "Closed");
        assert!(transition_rules(CardType::Epic).valid_statuses.is_empty());
    }

    #[test]
    fn test_available_transitions_for_task() {
        let mut task = ready_task();
        task.remove("sprint");
        let available = available_transitions(CardType::Task, &task);
        assert_eq!(available.current_status.as_deref(), Some("To Do"));
        assert_eq!(available.targets.len(), 5);

        let in_progress = available
            .targets
            .iter()
            .find(|t| t.status == "In Progress")
            .unwrap();
        assert!(!in_progress.allowed);
        assert_eq!(in_progress.missing_fields, vec!["sprint"]);

        let to_validate = available
            .targets
            .iter()
            .find(|t| t.status == "To Validate")
            .unwrap();
        assert!(!to_validate.allowed);
        assert!(to_validate.missing_fields.is_empty());

        let approved = available
            .targets
            .iter()
            .find(|t| t.status == "Done&Validated")
            .unwrap();
        assert!(approved.reason.as_deref().unwrap().contains("To Validate"));
    }

    #[test]
    fn test_available_transitions_for_bug() {
        let bug = doc(json!({"status": "Fixed", "rootCause": "x", "resolution": "y"}));
        let available = available_transitions(CardType::Bug, &bug);
        assert_eq!(available.targets.len(), 4);
        let closed = available.targets.iter().find(|t| t.status == "Closed").unwrap();
        assert_eq!(closed.missing_fields, vec!["commits"]);
        assert!(available.targets.iter().filter(|t| t.allowed).count() == 3);
    }
}
