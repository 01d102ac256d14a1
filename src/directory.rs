//! Directory lookups and validator auto-assignment.
//!
//! The engine never reads developer or stakeholder records directly; it goes
//! through [`Directory`], which only exposes reads.

use crate::engine::{Violation, ViolationKind};
use crate::models::{Document, Person, Project};
use crate::storage::{self, DocumentStore};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Read-only access to projects and the people they reference.
pub trait Directory {
    fn project(&self, project_id: &str) -> Result<Option<Project>>;
    fn developer(&self, id: &str) -> Result<Option<Person>>;
    fn stakeholder(&self, id: &str) -> Result<Option<Person>>;
}

/// [`Directory`] over a document store.
pub struct StoreDirectory<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> StoreDirectory<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn person(&self, path: &str) -> Result<Option<Person>> {
        self.store.get(path)?.map(decode).transpose()
    }
}

fn decode<T: serde::de::DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

impl<S: DocumentStore + ?Sized> Directory for StoreDirectory<'_, S> {
    fn project(&self, project_id: &str) -> Result<Option<Project>> {
        self.store
            .get(&storage::project_path(project_id))?
            .map(decode)
            .transpose()
    }

    fn developer(&self, id: &str) -> Result<Option<Person>> {
        self.person(&storage::developer_path(id))
    }

    fn stakeholder(&self, id: &str) -> Result<Option<Person>> {
        self.person(&storage::stakeholder_path(id))
    }
}

/// Load a project or fail with `NotFound`.
pub fn require_project<D: Directory + ?Sized>(dir: &D, project_id: &str) -> Result<Project> {
    dir.project(project_id)?
        .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))
}

/// How a validator was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorSource {
    /// Supplied by the caller.
    Explicit,
    /// The developer is also a stakeholder on the project.
    DeveloperIdentity,
    /// The project's default validator.
    ProjectDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorChoice {
    pub validator: String,
    pub source: ValidatorSource,
}

/// Decide who approves a task.
///
/// An explicit validator is returned unchanged. Otherwise the developer's
/// contact identity is matched against the project's stakeholders, then the
/// project default is used. Failing both, the error lists the active
/// stakeholders to pick from.
pub fn resolve_validator<D: Directory + ?Sized>(
    dir: &D,
    project_id: &str,
    explicit: Option<&str>,
    developer: Option<&str>,
) -> Result<ValidatorChoice> {
    if let Some(explicit) = explicit.filter(|v| !v.trim().is_empty()) {
        return Ok(ValidatorChoice {
            validator: explicit.to_string(),
            source: ValidatorSource::Explicit,
        });
    }

    let project = require_project(dir, project_id)?;

    let identity = match developer.filter(|d| !d.trim().is_empty()) {
        Some(dev) => dir.developer(dev)?.and_then(|p| p.identity()),
        None => None,
    };
    if let Some(identity) = identity {
        for stk in &project.stakeholders {
            let matched = dir
                .stakeholder(stk)?
                .is_some_and(|p| p.active && p.identity().as_ref() == Some(&identity));
            if matched {
                tracing::debug!(project = project_id, validator = %stk, "validator matched by identity");
                return Ok(ValidatorChoice {
                    validator: stk.clone(),
                    source: ValidatorSource::DeveloperIdentity,
                });
            }
        }
    }

    if let Some(default) = project
        .default_validator
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        return Ok(ValidatorChoice {
            validator: default.to_string(),
            source: ValidatorSource::ProjectDefault,
        });
    }

    if project.stakeholders.is_empty() {
        return Err(Violation::new(
            ViolationKind::NoStakeholdersInProject,
            format!(
                "Project '{}' has no stakeholders; add one before assigning a validator",
                project_id
            ),
        )
        .with_field("validator")
        .into());
    }

    let mut candidates = Vec::new();
    for stk in &project.stakeholders {
        match dir.stakeholder(stk)? {
            Some(p) if p.active => candidates.push(format!("{} ({})", stk, p.name)),
            Some(_) => {}
            None => candidates.push(stk.clone()),
        }
    }
    Err(Violation::new(
        ViolationKind::NoValidatorAssignable,
        format!(
            "No validator could be assigned automatically. Choose one of: {}",
            candidates.join(", ")
        ),
    )
    .with_field("validator")
    .with_expected(candidates)
    .into())
}
