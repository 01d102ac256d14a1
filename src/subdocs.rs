//! Shape checks for nested card data.
//!
//! Each validator returns every problem it finds, one violation per bad
//! element, so callers can fix a whole list in one pass.

use crate::engine::{Violation, ViolationKind};
use crate::models::{AcceptanceScenario, ImplementationPlan, PlanStatus, StepStatus};
use serde_json::Value;
use std::collections::HashSet;

const COMMIT_FIELDS: &[&str] = &["hash", "message", "date", "author"];
const DESCRIPTION_FIELDS: &[&str] = &["role", "goal", "benefit"];

fn is_blank_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_none_or(|s| s.trim().is_empty())
}

fn invalid(field: &str, message: String) -> Violation {
    Violation::new(ViolationKind::InvalidSubdocument, message).with_field(field)
}

fn not_an_array(field: &str, value: &Value) -> Violation {
    invalid(field, format!("{} must be a list, got {}", field, type_name(value))).with_actual(value.clone())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Validate a `commits` list. An empty list is valid.
pub fn validate_commits(value: &Value) -> Vec<Violation> {
    let Some(items) = value.as_array() else {
        return vec![not_an_array("commits", value)];
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let field = format!("commits[{}]", i);
            let Some(obj) = item.as_object() else {
                return Some(
                    invalid(&field, format!("{} must be an object with hash, message, date and author", field))
                        .with_actual(item.clone()),
                );
            };
            let missing: Vec<&str> = COMMIT_FIELDS
                .iter()
                .copied()
                .filter(|f| is_blank_str(obj.get(*f)))
                .collect();
            if missing.is_empty() {
                return None;
            }
            Some(
                invalid(
                    &field,
                    format!("{} needs non-blank text for: {}", field, missing.join(", ")),
                )
                .with_missing(missing),
            )
        })
        .collect()
}

fn commit_hash(item: &Value) -> Option<&str> {
    item.get("hash").and_then(Value::as_str).map(str::trim)
}

/// Union `incoming` into `existing` by hash.
///
/// Existing entries are kept as stored, and within `incoming` the first
/// entry for a hash wins. Entries without a hash are appended untouched.
pub fn merge_commits(existing: &[Value], incoming: &[Value]) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.iter().chain(incoming) {
        match commit_hash(item) {
            Some(hash) if !seen.insert(hash.to_string()) => continue,
            _ => merged.push(item.clone()),
        }
    }
    merged
}

/// Upgrade a legacy free-text plan to the structured shape.
///
/// Blank text becomes `null`. Anything that is not a string is returned
/// unchanged for [`validate_plan`] to judge.
pub fn normalize_plan(raw: &Value) -> Value {
    match raw {
        Value::String(text) if text.trim().is_empty() => Value::Null,
        Value::String(text) => serde_json::to_value(ImplementationPlan::from_legacy_text(text))
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Validate a structured plan. `null` is valid (no plan).
pub fn validate_plan(value: &Value) -> Vec<Violation> {
    let field = "implementationPlan";
    let obj = match value {
        Value::Null => return Vec::new(),
        Value::Object(obj) => obj,
        other => {
            return vec![
                invalid(field, format!("{} must be text or an object, got {}", field, type_name(other)))
                    .with_actual(other.clone()),
            ];
        }
    };

    let mut violations = Vec::new();
    if is_blank_str(obj.get("approach")) {
        violations.push(
            invalid(&format!("{field}.approach"), format!("{field}.approach is required"))
                .with_missing(["approach"]),
        );
    }

    if let Some(status) = obj.get("planStatus").filter(|v| !v.is_null()) {
        if status.as_str().and_then(PlanStatus::parse).is_none() {
            let valid: Vec<&str> = PlanStatus::all().iter().map(PlanStatus::as_str).collect();
            violations.push(
                invalid(
                    &format!("{field}.planStatus"),
                    format!("Invalid plan status {}. Valid values: {}", status, valid.join(", ")),
                )
                .with_expected(valid)
                .with_actual(status.clone()),
            );
        }
    }

    match obj.get("steps") {
        None | Some(Value::Null) => {}
        Some(Value::Array(steps)) => {
            for (i, step) in steps.iter().enumerate() {
                violations.extend(step_violations(&format!("{field}.steps[{i}]"), step));
            }
        }
        Some(other) => violations.push(not_an_array(&format!("{field}.steps"), other)),
    }
    violations
}

fn step_violations(field: &str, step: &Value) -> Vec<Violation> {
    let Some(obj) = step.as_object() else {
        return vec![
            invalid(field, format!("{} must be an object with a description", field)).with_actual(step.clone()),
        ];
    };
    let mut violations = Vec::new();
    if is_blank_str(obj.get("description")) {
        violations.push(
            invalid(field, format!("{}.description is required", field)).with_missing(["description"]),
        );
    }
    if let Some(status) = obj.get("status").filter(|v| !v.is_null()) {
        if status.as_str().and_then(StepStatus::parse).is_none() {
            let valid: Vec<&str> = StepStatus::all().iter().map(StepStatus::as_str).collect();
            violations.push(
                invalid(
                    &format!("{field}.status"),
                    format!("Invalid step status {}. Valid values: {}", status, valid.join(", ")),
                )
                .with_expected(valid)
                .with_actual(status.clone()),
            );
        }
    }
    violations
}

/// Current status of a plan value, if it is a structured plan.
pub fn plan_status(plan: &Value) -> Option<PlanStatus> {
    let obj = plan.as_object()?;
    match obj.get("planStatus").and_then(Value::as_str) {
        Some(s) => PlanStatus::parse(s),
        None => Some(PlanStatus::default()),
    }
}

/// Move a plan forward to `target`, leaving every other key alone.
///
/// Returns the previous status when the plan changed. Plans are never moved
/// backwards.
pub fn advance_plan(plan: &mut Value, target: PlanStatus) -> Option<PlanStatus> {
    let current = plan_status(plan)?;
    let mut typed = ImplementationPlan {
        plan_status: current,
        ..Default::default()
    };
    if !typed.advance_to(target) {
        return None;
    }
    let obj = plan.as_object_mut()?;
    obj.insert(
        "planStatus".to_string(),
        Value::String(typed.plan_status.as_str().to_string()),
    );
    Some(current)
}

/// Validate `acceptanceCriteriaStructured`.
pub fn validate_acceptance_scenarios(value: &Value) -> Vec<Violation> {
    let field = "acceptanceCriteriaStructured";
    let Some(items) = value.as_array() else {
        return vec![not_an_array(field, value)];
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let scenario = serde_json::from_value::<AcceptanceScenario>(item.clone()).ok();
            if scenario.is_some_and(|s| s.has_content()) {
                return None;
            }
            Some(
                invalid(
                    &format!("{field}[{i}]"),
                    format!(
                        "{field}[{i}] needs at least one of given, when, then or raw"
                    ),
                )
                .with_actual(item.clone()),
            )
        })
        .collect()
}

/// True when at least one scenario in the list carries text.
pub fn has_acceptance_content(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|items| {
            items.iter().any(|item| {
                serde_json::from_value::<AcceptanceScenario>(item.clone())
                    .is_ok_and(|s| s.has_content())
            })
        })
}

/// Validate `descriptionStructured`: role, goal and benefit on every entry.
pub fn validate_description(value: &Value) -> Vec<Violation> {
    let field = "descriptionStructured";
    let Some(items) = value.as_array() else {
        return vec![not_an_array(field, value)];
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let item_field = format!("{field}[{i}]");
            let missing: Vec<&str> = match item.as_object() {
                Some(obj) => DESCRIPTION_FIELDS
                    .iter()
                    .copied()
                    .filter(|f| is_blank_str(obj.get(*f)))
                    .collect(),
                None => DESCRIPTION_FIELDS.to_vec(),
            };
            if missing.is_empty() {
                return None;
            }
            Some(
                invalid(
                    &item_field,
                    format!("{} needs non-blank text for: {}", item_field, missing.join(", ")),
                )
                .with_missing(missing),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn commit(hash: &str) -> Value {
        json!({"hash": hash, "message": "msg", "date": "2026-03-01", "author": "ada"})
    }

    #[test]
    fn test_empty_commit_list_is_valid() {
        assert!(validate_commits(&json!([])).is_empty());
        assert!(validate_commits(&json!([commit("a1")])).is_empty());
    }

    #[test]
    fn test_commit_errors_are_itemized() {
        let value = json!([
            commit("a1"),
            {"hash": "b2", "message": " ", "date": "2026-03-01"},
            "c3",
            {"hash": 7, "message": "m", "date": "d", "author": "a"}
        ]);
        let violations = validate_commits(&value);
        let fields: Vec<_> = violations.iter().map(|v| v.field.clone().unwrap()).collect();
        assert_eq!(fields, vec!["commits[1]", "commits[2]", "commits[3]"]);
        assert_eq!(violations[0].missing, vec!["message", "author"]);
        assert_eq!(violations[2].missing, vec!["hash"]);
        assert!(violations.iter().all(|v| v.kind == ViolationKind::InvalidSubdocument));
    }

    #[test]
    fn test_commits_must_be_a_list() {
        let violations = validate_commits(&json!({"hash": "a"}));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("an object"));
    }

    #[test]
    fn test_merge_commits_unions_by_hash() {
        let first = vec![commit("a1"), commit("b2")];
        let mut changed = commit("b2");
        changed["message"] = json!("rewritten");
        let second = vec![changed, commit("c3"), commit("c3")];

        let merged = merge_commits(&first, &second);
        let hashes: Vec<_> = merged.iter().map(|c| c["hash"].as_str().unwrap()).collect();
        assert_eq!(hashes, vec!["a1", "b2", "c3"]);
        assert_eq!(merged.len(), first.len() + 2 - 1);
        assert_eq!(merged[1]["message"], "msg");
    }

    #[test]
    fn test_normalize_legacy_plan() {
        let plan = normalize_plan(&json!("Add an export button"));
        assert_eq!(plan["approach"], "Add an export button");
        assert_eq!(plan["planStatus"], "proposed");
        assert_eq!(plan["steps"], json!([]));
        assert_eq!(plan["risks"], "");
        assert!(validate_plan(&plan).is_empty());

        assert_eq!(normalize_plan(&json!("  ")), Value::Null);
        let structured = json!({"approach": "x"});
        assert_eq!(normalize_plan(&structured), structured);
    }

    #[test]
    fn test_validate_plan() {
        let plan = json!({
            "approach": "",
            "planStatus": "approved",
            "steps": [
                {"description": "one", "status": "done"},
                {"description": " ", "status": "later"},
                5
            ]
        });
        let fields: Vec<_> = validate_plan(&plan)
            .into_iter()
            .map(|v| v.field.unwrap())
            .collect();
        assert_eq!(
            fields,
            vec![
                "implementationPlan.approach",
                "implementationPlan.planStatus",
                "implementationPlan.steps[1]",
                "implementationPlan.steps[1].status",
                "implementationPlan.steps[2]",
            ]
        );
        assert!(validate_plan(&Value::Null).is_empty());
        assert_eq!(validate_plan(&json!(3)).len(), 1);
    }

    #[test]
    fn test_advance_plan_never_goes_back() {
        let mut plan = json!({"approach": "x", "planStatus": "validated", "owner": "ada"});
        assert_eq!(
            advance_plan(&mut plan, PlanStatus::InProgress),
            Some(PlanStatus::Validated)
        );
        assert_eq!(plan["planStatus"], "in_progress");
        assert_eq!(plan["owner"], "ada");

        assert_eq!(advance_plan(&mut plan, PlanStatus::Proposed), None);
        assert_eq!(plan["planStatus"], "in_progress");

        let mut missing_status = json!({"approach": "x"});
        assert_eq!(plan_status(&missing_status), Some(PlanStatus::Pending));
        advance_plan(&mut missing_status, PlanStatus::Completed);
        assert_eq!(missing_status["planStatus"], "completed");
    }

    #[test]
    fn test_acceptance_scenarios() {
        let value = json!([
            {"given": "a user", "when": "they export", "then": "a file downloads"},
            {"raw": "works offline"},
            {"given": " "},
            "free text"
        ]);
        let fields: Vec<_> = validate_acceptance_scenarios(&value)
            .into_iter()
            .map(|v| v.field.unwrap())
            .collect();
        assert_eq!(
            fields,
            vec!["acceptanceCriteriaStructured[2]", "acceptanceCriteriaStructured[3]"]
        );
        assert!(has_acceptance_content(Some(&value)));
        assert!(!has_acceptance_content(Some(&json!([{"then": ""}]))));
        assert!(!has_acceptance_content(None));
    }

    #[test]
    fn test_description_entries() {
        let value = json!([
            {"role": "user", "goal": "export data", "benefit": "share reports"},
            {"role": "admin", "goal": ""},
        ]);
        let violations = validate_description(&value);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].missing, vec!["goal", "benefit"]);
    }
}
