//! Card state machine.
//!
//! [`CardEngine`] decides whether a create or update is admissible and
//! computes what it implies: canonical vocabulary values, the active sprint,
//! start/end dates, plan status progression, the assigned validator and the
//! derived priority. Rules run in a fixed order:
//!
//! 1. protected fields
//! 2. vocabulary (status, priority, points)
//! 3. transition requirements (epic, sprint, validator, gates)
//! 4. sub-document shape
//! 5. reference format
//!
//! In [`Mode::Apply`] the first violation aborts the call; in
//! [`Mode::ValidateOnly`] every violation is reported and nothing is written.
//! Either way no write happens until every rule has passed.

mod report;
mod rules;
mod state;

pub use report::{Mode, ValidationReport, Violation, ViolationKind};
pub use rules::{
    AvailableTransitions, BASE_REQUIRED_FIELDS, BUG_CLOSE_FIELDS, RequiredFieldsEntry, TargetStatus,
    TransitionEntry, TransitionRules, available_transitions, is_filled, missing_bug_close_fields,
    missing_task_fields, task_targets, transition_rules,
};
pub use state::projected_state;

use report::Collector;

use crate::Result;
use crate::directory::{self, StoreDirectory};
use crate::lookup::{ListKind, ListService};
use crate::models::{BugStatus, CardType, Document, PROTECTED_FIELDS, PlanStatus, PointScale, Project, TaskStatus};
use crate::priority::calculate_priority;
use crate::references::collect_reference_violations;
use crate::sprints;
use crate::storage::{self, DocumentStore};
use crate::subdocs;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

const VERSIONING_REMINDER: &str =
    "Remember to bump the version and update the changelog for this change";

/// Defaults the engine applies when a project does not say otherwise.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Scale for projects without a `scoringSystem`.
    pub default_scale: PointScale,
    /// Recorded in `createdBy`/`updatedBy`.
    pub user: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_scale: PointScale::default(),
            user: "unknown".to_string(),
        }
    }
}

/// A value the engine filled in on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideEffect {
    pub field: String,
    pub value: Value,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
    pub card_id: String,
    pub key: String,
    pub side_effects: Vec<SideEffect>,
    pub warnings: Vec<String>,
    pub card: Document,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedUpdate {
    pub card_id: String,
    pub key: String,
    pub updated_fields: Vec<String>,
    pub side_effects: Vec<SideEffect>,
    pub warnings: Vec<String>,
    pub card: Document,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UpdateOutcome {
    Applied(AppliedUpdate),
    Report(ValidationReport),
}

/// Working state of one evaluation.
struct Pass<'p> {
    project_id: &'p str,
    project: Project,
    scale: PointScale,
    card_type: CardType,
    creating: bool,
    current: Document,
    proposed: Document,
    collector: Collector,
    side_effects: Vec<SideEffect>,
    warnings: Vec<String>,
}

impl Pass<'_> {
    fn merged(&self) -> Document {
        projected_state(&self.current, &self.proposed)
    }

    fn apply_effect(&mut self, field: &str, value: Value, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(field, %value, reason = %reason, "side effect");
        self.proposed.insert(field.to_string(), value.clone());
        self.side_effects.push(SideEffect {
            field: field.to_string(),
            value,
            reason,
        });
    }
}

/// Result of a pass that found no blocking violation (or ran validate-only).
struct Evaluation {
    project: Project,
    changes: Document,
    record: Document,
    side_effects: Vec<SideEffect>,
    warnings: Vec<String>,
    violations: Vec<Violation>,
}

impl Evaluation {
    fn into_report(self) -> ValidationReport {
        ValidationReport {
            valid: self.violations.is_empty(),
            violations: self.violations,
            warnings: self.warnings,
        }
    }
}

/// Decides and applies card mutations against a document store.
pub struct CardEngine<'a> {
    store: &'a mut dyn DocumentStore,
    lists: &'a ListService,
    settings: EngineSettings,
    today: NaiveDate,
}

impl<'a> CardEngine<'a> {
    pub fn new(store: &'a mut dyn DocumentStore, lists: &'a ListService, settings: EngineSettings) -> Self {
        Self {
            store,
            lists,
            settings,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Override the date used for sprint lookup and auto-filled dates.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Create a card, minting its id from the project's counter.
    pub fn create_card(
        &mut self,
        project_id: &str,
        card_type: CardType,
        fields: Document,
    ) -> Result<CreateOutcome> {
        let eval = self.evaluate(project_id, card_type, None, &fields, Mode::Apply)?;

        let counter = format!(
            "{}-{}",
            eval.project.abbreviation_for(project_id),
            card_type.abbreviation()
        );
        let seq = self.store.increment(&counter)?;
        let card_id = format!("{}-{:04}", counter, seq);
        let key = storage::new_key();

        let now = Utc::now().to_rfc3339();
        let mut card = eval.record;
        card.insert("cardId".into(), Value::String(card_id.clone()));
        card.insert("cardType".into(), Value::String(card_type.as_str().to_string()));
        card.insert("projectId".into(), Value::String(project_id.to_string()));
        card.insert("createdAt".into(), Value::String(now.clone()));
        card.insert("createdBy".into(), Value::String(self.settings.user.clone()));
        card.insert("updatedAt".into(), Value::String(now));
        card.insert("updatedBy".into(), Value::String(self.settings.user.clone()));

        self.store
            .set(&storage::card_path(project_id, card_type, &key), &card)?;
        tracing::info!(card = %card_id, project = project_id, "card created");

        Ok(CreateOutcome {
            card_id,
            key,
            side_effects: eval.side_effects,
            warnings: eval.warnings,
            card,
        })
    }

    /// Evaluate a create without writing anything, not even the counter.
    pub fn validate_create(
        &self,
        project_id: &str,
        card_type: CardType,
        fields: &Document,
    ) -> Result<ValidationReport> {
        Ok(self
            .evaluate(project_id, card_type, None, fields, Mode::ValidateOnly)?
            .into_report())
    }

    /// Apply a partial update, or report on it in validate-only mode.
    ///
    /// `id_or_key` is either the card id (`PLN-TSK-0007`) or the storage key.
    pub fn update_card(
        &mut self,
        project_id: &str,
        card_type: CardType,
        id_or_key: &str,
        patch: Document,
        mode: Mode,
    ) -> Result<UpdateOutcome> {
        let (key, current) = storage::find_card(&*self.store, project_id, card_type, id_or_key)?;
        let eval = self.evaluate(project_id, card_type, Some(&current), &patch, mode)?;
        if mode == Mode::ValidateOnly {
            return Ok(UpdateOutcome::Report(eval.into_report()));
        }

        let updated_fields: Vec<String> = eval.changes.keys().cloned().collect();
        let now = Value::String(Utc::now().to_rfc3339());
        let user = Value::String(self.settings.user.clone());

        let mut changes = eval.changes;
        changes.insert("updatedAt".into(), now.clone());
        changes.insert("updatedBy".into(), user.clone());
        self.store
            .merge(&storage::card_path(project_id, card_type, &key), &changes)?;

        let mut card = eval.record;
        card.insert("updatedAt".into(), now);
        card.insert("updatedBy".into(), user);
        let card_id = card
            .get("cardId")
            .and_then(Value::as_str)
            .unwrap_or(&key)
            .to_string();
        tracing::info!(card = %card_id, fields = ?updated_fields, "card updated");

        Ok(UpdateOutcome::Applied(AppliedUpdate {
            card_id,
            key,
            updated_fields,
            side_effects: eval.side_effects,
            warnings: eval.warnings,
            card,
        }))
    }

    fn evaluate(
        &self,
        project_id: &str,
        card_type: CardType,
        current: Option<&Document>,
        patch: &Document,
        mode: Mode,
    ) -> Result<Evaluation> {
        let dir = StoreDirectory::new(&*self.store);
        let project = directory::require_project(&dir, project_id)?;
        let scale = project.scale(self.settings.default_scale);

        let creating = current.is_none();
        let mut current = current.cloned().unwrap_or_default();
        if creating {
            if let Some(initial) = card_type.initial_status() {
                current.insert("status".into(), Value::String(initial.to_string()));
            }
        }

        // Legacy free-text plans are upgraded before any rule sees them.
        let mut proposed = patch.clone();
        for doc in [&mut current, &mut proposed] {
            if let Some(raw) = doc.get("implementationPlan") {
                let plan = subdocs::normalize_plan(raw);
                doc.insert("implementationPlan".into(), plan);
            }
        }

        let mut pass = Pass {
            project_id,
            project,
            scale,
            card_type,
            creating,
            current,
            proposed,
            collector: Collector::new(mode),
            side_effects: Vec::new(),
            warnings: Vec::new(),
        };

        self.check_protected(&mut pass)?;
        self.check_vocabulary(&mut pass)?;
        match card_type {
            CardType::Task => self.check_task_rules(&mut pass)?,
            CardType::Bug => self.check_bug_rules(&mut pass)?,
            _ => {}
        }
        self.check_subdocuments(&mut pass)?;
        let references = collect_reference_violations(&pass.proposed);
        pass.collector.record(references)?;

        if card_type == CardType::Task {
            self.derive_priority(&mut pass);
        }

        let record = pass.merged();
        let mut changes = pass.proposed;
        if let Some(commits) = record.get("commits").filter(|_| changes.contains_key("commits")) {
            changes.insert("commits".into(), commits.clone());
        }

        Ok(Evaluation {
            project: pass.project,
            changes,
            record,
            side_effects: pass.side_effects,
            warnings: pass.warnings,
            violations: pass.collector.into_violations(),
        })
    }

    fn check_protected(&self, pass: &mut Pass) -> Result<()> {
        let mut found = Vec::new();
        for field in PROTECTED_FIELDS {
            let Some(value) = pass.proposed.remove(*field) else {
                continue;
            };
            let stored = if pass.creating {
                match *field {
                    "cardType" => Some(Value::String(pass.card_type.as_str().to_string())),
                    "projectId" => Some(Value::String(pass.project_id.to_string())),
                    _ => None,
                }
            } else {
                pass.current.get(*field).cloned()
            };
            if stored.as_ref() == Some(&value) {
                continue;
            }
            let shown = stored.map_or_else(|| "unset".to_string(), |v| v.to_string());
            found.push(
                Violation::new(
                    ViolationKind::ProtectedFieldViolation,
                    format!("{} cannot be changed (stored: {}, proposed: {})", field, shown, value),
                )
                .with_field(*field)
                .with_actual(value),
            );
        }
        pass.collector.record(found)
    }

    fn check_vocabulary(&self, pass: &mut Pass) -> Result<()> {
        match pass.card_type {
            CardType::Task => {
                if let Some(priority) = pass.proposed.remove("priority").filter(|v| !v.is_null()) {
                    pass.collector.record_one(Some(
                        Violation::new(
                            ViolationKind::DirectPriorityNotAllowed,
                            format!(
                                "Task priority is derived from businessPoints and devPoints; remove priority ({}) and set the points instead",
                                priority
                            ),
                        )
                        .with_field("priority")
                        .with_expected(["businessPoints", "devPoints"])
                        .with_actual(priority),
                    ))?;
                }
            }
            CardType::Bug => {
                self.canonicalize_field(pass, ListKind::BugPriority, "priority")?;
            }
            _ => {}
        }

        let status_list = match pass.card_type {
            CardType::Task => Some(ListKind::TaskStatus),
            CardType::Bug => Some(ListKind::BugStatus),
            _ => None,
        };
        if let Some(kind) = status_list {
            self.canonicalize_field(pass, kind, "status")?;
        }

        if pass.card_type == CardType::Task {
            let unknown = pass
                .proposed
                .get("status")
                .and_then(Value::as_str)
                .filter(|s| TaskStatus::parse(s).is_none())
                .map(str::to_string);
            if let Some(status) = unknown {
                pass.proposed.remove("status");
                let valid: Vec<&str> = TaskStatus::all().iter().map(TaskStatus::as_str).collect();
                pass.collector.record_one(Some(
                    Violation::new(
                        ViolationKind::InvalidVocabularyValue,
                        format!(
                            "Status '{}' has no task workflow rules. Valid values: {}",
                            status,
                            valid.join(", ")
                        ),
                    )
                    .with_field("status")
                    .with_expected(valid)
                    .with_actual(status),
                ))?;
            }
        }

        for field in ["devPoints", "businessPoints"] {
            let Some(raw) = pass.proposed.get(field).filter(|v| !v.is_null()).cloned() else {
                continue;
            };
            match point_value(&raw).filter(|p| pass.scale.contains(*p)) {
                Some(points) => {
                    pass.proposed.insert(field.to_string(), Value::from(points));
                }
                None => {
                    pass.proposed.remove(field);
                    let valid: Vec<String> = pass.scale.values().iter().map(u32::to_string).collect();
                    pass.collector.record_one(Some(
                        Violation::new(
                            ViolationKind::InvalidVocabularyValue,
                            format!(
                                "Invalid {} {} for the {} scale. Valid values: {}",
                                field,
                                raw,
                                pass.scale,
                                valid.join(", ")
                            ),
                        )
                        .with_field(field)
                        .with_expected(valid)
                        .with_actual(raw),
                    ))?;
                }
            }
        }
        Ok(())
    }

    /// Replace `field` in the proposal with its canonical list value.
    fn canonicalize_field(&self, pass: &mut Pass, kind: ListKind, field: &str) -> Result<()> {
        let Some(raw) = pass.proposed.get(field).cloned() else {
            return Ok(());
        };
        let canonical = match &raw {
            Value::String(text) => pass
                .collector
                .absorb(self.lists.canonicalize(&*self.store, kind, field, text))?,
            other => {
                let valid = self.lists.list_texts(&*self.store, kind)?;
                pass.collector.record_one(Some(
                    Violation::new(
                        ViolationKind::InvalidVocabularyValue,
                        format!("{} must be one of: {} (got {})", field, valid.join(", "), other),
                    )
                    .with_field(field)
                    .with_expected(valid.iter().cloned())
                    .with_actual(other.clone()),
                ))?;
                None
            }
        };
        match canonical {
            Some(text) => {
                pass.proposed.insert(field.to_string(), Value::String(text));
            }
            None => {
                pass.proposed.remove(field);
            }
        }
        Ok(())
    }

    fn check_task_rules(&self, pass: &mut Pass) -> Result<()> {
        let source = &*self.store;
        self.check_epic(pass)?;

        let touches_description = pass.creating || pass.proposed.contains_key("descriptionStructured");
        if touches_description && !is_filled(&pass.merged(), "descriptionStructured") {
            pass.collector.record_one(Some(
                Violation::new(
                    ViolationKind::MissingRequiredFields,
                    "Tasks need at least one descriptionStructured entry with role, goal and benefit",
                )
                .with_field("descriptionStructured")
                .with_missing(["descriptionStructured"]),
            ))?;
        }

        if let Some(sprint) = pass.proposed.get("sprint").cloned() {
            let known = sprints::load_sprints(source, pass.project_id)?;
            let violation = sprints::sprint_value_violation(&known, &sprint);
            if violation.is_some() && !sprint.is_string() {
                pass.proposed.remove("sprint");
            }
            pass.collector.record_one(violation)?;
        }

        if pass.creating && !is_filled(&pass.merged(), "validator") {
            let merged = pass.merged();
            let developer = merged.get("developer").and_then(Value::as_str);
            let dir = StoreDirectory::new(source);
            let resolved = directory::resolve_validator(&dir, pass.project_id, None, developer);
            if let Some(choice) = pass.collector.absorb(resolved)? {
                let reason = match choice.source {
                    directory::ValidatorSource::DeveloperIdentity => "developer is also a project stakeholder",
                    _ => "project default validator",
                };
                pass.apply_effect("validator", Value::String(choice.validator), reason);
            }
        }

        let stored_status = pass.current.get("status").and_then(Value::as_str);
        let from = match stored_status.map(|s| (s, TaskStatus::parse_loose(s))) {
            Some((_, Some(status))) => status,
            Some((label, None)) => {
                tracing::warn!(status = label, "stored task status is not part of the workflow; treating it as To Do");
                TaskStatus::ToDo
            }
            None => TaskStatus::ToDo,
        };
        let Some(target) = pass
            .proposed
            .get("status")
            .and_then(Value::as_str)
            .and_then(TaskStatus::parse)
        else {
            return Ok(());
        };
        if target == from {
            return Ok(());
        }
        tracing::debug!(from = %from, to = %target, "evaluating task transition");

        if target == TaskStatus::DoneValidated {
            return pass.collector.record_one(Some(
                Violation::new(
                    ViolationKind::ValidatorOnlyTransition,
                    format!(
                        "'{}' can only be set by the validator's approval workflow. Move the task to '{}' and ask the validator to approve it",
                        target,
                        TaskStatus::ToValidate
                    ),
                )
                .with_field("status")
                .with_expected([TaskStatus::ToValidate.as_str()])
                .with_actual(target.as_str()),
            ));
        }

        let allowed = task_targets(from);
        if !allowed.contains(&target) {
            let names: Vec<&str> = allowed.iter().map(TaskStatus::as_str).collect();
            return pass.collector.record_one(Some(
                Violation::new(
                    ViolationKind::InvalidTransition,
                    format!(
                        "Cannot move a task from '{}' to '{}'. Allowed next statuses: {}",
                        from,
                        target,
                        if names.is_empty() { "none".to_string() } else { names.join(", ") }
                    ),
                )
                .with_field("status")
                .with_expected(names)
                .with_actual(target.as_str()),
            ));
        }

        if target != TaskStatus::ToDo && !is_filled(&pass.merged(), "sprint") {
            if let Some(active) = sprints::find_active_sprint(source, pass.project_id, self.today)? {
                pass.apply_effect("sprint", Value::String(active.card_id), "active sprint");
            }
        }

        let merged = pass.merged();
        let missing = missing_task_fields(target, &merged);
        if !missing.is_empty() {
            let mut message = format!(
                "Cannot move task from '{}' to '{}': missing {}",
                from,
                target,
                missing.join(", ")
            );
            if missing.iter().any(|f| f == "sprint") {
                message.push_str(" (the project has no active sprint to assign)");
            }
            pass.collector.record_one(Some(
                Violation::new(ViolationKind::MissingRequiredFields, message)
                    .with_field("status")
                    .with_missing(missing),
            ))?;
        }

        let today = Value::String(self.today.format("%Y-%m-%d").to_string());
        let plan = merged
            .get("implementationPlan")
            .filter(|p| !p.is_null())
            .cloned();
        match target {
            TaskStatus::InProgress => {
                if !is_filled(&merged, "startDate") {
                    pass.apply_effect("startDate", today, "task started");
                }
                match plan {
                    Some(mut plan) => match subdocs::plan_status(&plan) {
                        Some(PlanStatus::Validated) => {
                            subdocs::advance_plan(&mut plan, PlanStatus::InProgress);
                            pass.apply_effect("implementationPlan", plan, "validated plan moved to in_progress");
                        }
                        Some(PlanStatus::Proposed) => pass.warnings.push(
                            "The implementation plan is still proposed; ask a stakeholder to validate it".to_string(),
                        ),
                        _ => {}
                    },
                    None => {
                        let effort = merged.get("devPoints").and_then(point_value).unwrap_or(0);
                        if effort >= 3 {
                            pass.warnings.push(format!(
                                "This task has {} dev points and no implementation plan; consider writing one",
                                effort
                            ));
                        }
                    }
                }
            }
            TaskStatus::ToValidate => {
                if let Some(mut plan) = plan {
                    if subdocs::advance_plan(&mut plan, PlanStatus::Completed).is_some() {
                        pass.apply_effect("implementationPlan", plan, "plan completed");
                    }
                }
                if !is_filled(&merged, "endDate") {
                    pass.apply_effect("endDate", today, "task submitted for validation");
                }
                pass.warnings.push(VERSIONING_REMINDER.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn check_epic(&self, pass: &mut Pass) -> Result<()> {
        let supplied = pass.proposed.get("epic").cloned();
        if !pass.creating && supplied.is_none() {
            return Ok(());
        }
        // (key, cardId, title); either the card id or the key names an epic.
        let epics: Vec<(String, String, String)> = self
            .store
            .list(&storage::cards_path(pass.project_id, CardType::Epic))?
            .into_iter()
            .map(|(key, doc)| {
                let id = doc
                    .get("cardId")
                    .and_then(Value::as_str)
                    .unwrap_or(&key)
                    .to_string();
                let title = doc
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (key, id, title)
            })
            .collect();
        let listing: Vec<String> = epics
            .iter()
            .map(|(_, id, title)| format!("{} ({})", id, title))
            .collect();
        let available = if listing.is_empty() {
            "none, create an epic first".to_string()
        } else {
            listing.join(", ")
        };

        let epic = supplied
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|e| !e.is_empty());
        let violation = match epic {
            None => Some(
                Violation::new(
                    ViolationKind::EpicRequired,
                    format!("Tasks must belong to an epic. Available epics: {}", available),
                )
                .with_field("epic")
                .with_expected(listing),
            ),
            Some(epic) if !epics.iter().any(|(key, id, _)| id == epic || key == epic) => Some(
                Violation::new(
                    ViolationKind::EpicNotFound,
                    format!("Epic '{}' not found. Available epics: {}", epic, available),
                )
                .with_field("epic")
                .with_expected(listing)
                .with_actual(epic),
            ),
            Some(_) => None,
        };
        pass.collector.record_one(violation)
    }

    fn check_bug_rules(&self, pass: &mut Pass) -> Result<()> {
        let from = pass
            .current
            .get("status")
            .and_then(Value::as_str)
            .and_then(BugStatus::parse);
        let Some(target) = pass
            .proposed
            .get("status")
            .and_then(Value::as_str)
            .and_then(BugStatus::parse)
        else {
            return Ok(());
        };
        if Some(target) == from {
            return Ok(());
        }
        match target {
            BugStatus::Closed => {
                let missing = missing_bug_close_fields(&pass.merged());
                if !missing.is_empty() {
                    pass.collector.record_one(Some(
                        Violation::new(
                            ViolationKind::DirectCloseWithoutDocumentation,
                            format!(
                                "Cannot close a bug without documenting the fix. Missing: {}",
                                missing.join(", ")
                            ),
                        )
                        .with_field("status")
                        .with_missing(missing),
                    ))?;
                }
            }
            BugStatus::Fixed => pass.warnings.push(VERSIONING_REMINDER.to_string()),
            _ => {}
        }
        Ok(())
    }

    fn check_subdocuments(&self, pass: &mut Pass) -> Result<()> {
        let mut found = Vec::new();
        if let Some(commits) = pass.proposed.get("commits") {
            found.extend(subdocs::validate_commits(commits));
        }
        if let Some(plan) = pass.proposed.get("implementationPlan") {
            found.extend(subdocs::validate_plan(plan));
        }
        if let Some(scenarios) = pass
            .proposed
            .get("acceptanceCriteriaStructured")
            .filter(|v| !v.is_null())
        {
            found.extend(subdocs::validate_acceptance_scenarios(scenarios));
        }
        if let Some(description) = pass
            .proposed
            .get("descriptionStructured")
            .filter(|v| !v.is_null())
        {
            found.extend(subdocs::validate_description(description));
        }
        pass.collector.record(found)
    }

    fn derive_priority(&self, pass: &mut Pass) {
        let merged = pass.merged();
        let business = merged.get("businessPoints").and_then(point_value);
        let effort = merged.get("devPoints").and_then(point_value);
        let priority = calculate_priority(business, effort, pass.scale);
        let value = priority.map_or(Value::Null, Value::from);
        if !pass.creating && merged.get("priority").unwrap_or(&Value::Null) == &value {
            return;
        }
        match priority {
            Some(rank) => pass.apply_effect(
                "priority",
                value,
                format!(
                    "business {} / effort {} on the {} scale ranks {}",
                    business.unwrap_or(0),
                    effort.unwrap_or(0),
                    pass.scale,
                    rank
                ),
            ),
            None => {
                pass.proposed.insert("priority".into(), Value::Null);
            }
        }
    }
}

/// Point values arrive as numbers or numeric strings.
fn point_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
