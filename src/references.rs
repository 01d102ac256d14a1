//! Namespaced id checks for people referenced by cards.
//!
//! Developers are `dev_*`, stakeholders are `stk_*`. Absent or empty values
//! always pass; whether a field is required is decided by the transition
//! gates, not here.

use crate::Result;
use crate::engine::{Violation, ViolationKind};
use crate::models::Document;
use serde_json::Value;

/// Card fields that hold a person reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceRole {
    Developer,
    Codeveloper,
    Validator,
    Stakeholder,
}

impl ReferenceRole {
    /// Roles that appear as card fields.
    pub fn card_fields() -> &'static [ReferenceRole] {
        &[
            ReferenceRole::Developer,
            ReferenceRole::Codeveloper,
            ReferenceRole::Validator,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceRole::Developer => "developer",
            ReferenceRole::Codeveloper => "codeveloper",
            ReferenceRole::Validator => "validator",
            ReferenceRole::Stakeholder => "stakeholder",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceRole::Developer | ReferenceRole::Codeveloper => "dev_",
            ReferenceRole::Validator | ReferenceRole::Stakeholder => "stk_",
        }
    }
}

/// Check one value. `None`, JSON null and blank strings pass.
pub fn reference_violation(role: ReferenceRole, value: Option<&Value>) -> Option<Violation> {
    let prefix = role.prefix();
    let offending = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) if s.trim().is_empty() => return None,
        Some(Value::String(s)) => {
            let rest = s.strip_prefix(prefix).unwrap_or("");
            if !rest.is_empty() && !rest.chars().any(char::is_whitespace) {
                return None;
            }
            s.clone()
        }
        Some(other) => other.to_string(),
    };

    Some(
        Violation::new(
            ViolationKind::InvalidReferenceFormat,
            format!(
                "Invalid {} reference '{}': expected an id starting with '{}'",
                role.as_str(),
                offending,
                prefix
            ),
        )
        .with_field(role.as_str())
        .with_expected([format!("{prefix}<id>")])
        .with_actual(offending),
    )
}

/// Fail-fast check of a single reference.
pub fn validate_reference(role: ReferenceRole, value: Option<&str>) -> Result<()> {
    let value = value.map(|s| Value::String(s.to_string()));
    match reference_violation(role, value.as_ref()) {
        Some(v) => Err(v.into()),
        None => Ok(()),
    }
}

/// Every reference violation among the card fields present in `doc`.
pub fn collect_reference_violations(doc: &Document) -> Vec<Violation> {
    ReferenceRole::card_fields()
        .iter()
        .filter_map(|role| reference_violation(*role, doc.get(role.as_str())))
        .collect()
}
