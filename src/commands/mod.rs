//! Command implementations for the `cf` CLI.
//!
//! This module contains the business logic behind each CLI command. The
//! tool server calls the same functions, so both surfaces share one path
//! into the engine. Commands are grouped by what they touch:
//! - `system` - data directory setup and vocabulary seeding
//! - `project`, `developer`, `stakeholder` - directory records
//! - `card` - create, update, show, list and transition introspection
//! - `rules`, `priority`, `lists` - read-only tables
//! - `config` - resolved settings

use crate::config::{self, CardflowConfig, ResolvedConfig};
use crate::engine::{
    AvailableTransitions, CardEngine, CreateOutcome, EngineSettings, Mode, TransitionRules,
    UpdateOutcome, ValidationReport, available_transitions, transition_rules,
};
use crate::lookup::{ListKind, ListService, VocabularyCache};
use crate::models::{CardType, Document, Person, PointScale, Project};
use crate::priority::{PriorityEntry, calculate_priority, priority_table};
use crate::references::{ReferenceRole, validate_reference};
use crate::storage::{self, DocumentStore, SqliteStore};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
}

/// Render a JSON value inline: strings bare, everything else as JSON.
fn inline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn render_document(doc: &Document, indent: &str) -> Vec<String> {
    doc.iter()
        .map(|(key, value)| format!("{}{}: {}", indent, key, inline(value)))
        .collect()
}

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: ResolvedConfig,
    lists: ListService,
}

impl Context {
    pub fn new(data_dir: impl Into<PathBuf>, config: ResolvedConfig) -> Self {
        let cache = Arc::new(VocabularyCache::new(config.vocabulary_ttl()));
        Self {
            data_dir: data_dir.into(),
            config,
            lists: ListService::new(cache),
        }
    }

    pub fn lists(&self) -> &ListService {
        &self.lists
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.data_dir)
    }

    /// The explicit project, else the configured default.
    pub fn project_id(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .or(self.config.default_project())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidInput(
                    "No project given: pass --project or set default-project".to_string(),
                )
            })
    }

    /// Engine settings, with `user` overriding the configured user.
    pub fn settings(&self, user: Option<&str>) -> EngineSettings {
        EngineSettings {
            default_scale: self.config.priority_scale.value,
            user: user
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(self.config.user())
                .to_string(),
        }
    }
}

/// Build a field document from a JSON object and `key=value` pairs.
///
/// Pair values are parsed as JSON when they parse, otherwise taken as
/// strings, so `devPoints=3` is a number and `title=Export CSV` a string.
/// Pairs are applied after the JSON object and win on conflicts.
pub fn parse_fields(json_patch: Option<&str>, sets: &[String]) -> Result<Document> {
    let mut fields = match json_patch {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidInput(format!(
                    "--json must be a JSON object, got {}",
                    other
                )));
            }
        },
        None => Document::new(),
    };
    for pair in sets {
        let (key, raw) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("Expected key=value, got '{}'", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput(format!("Empty field name in '{}'", pair)));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

// === System ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResult {
    pub initialized: bool,
    pub data_dir: String,
    pub seeded_lists: Vec<String>,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![if self.initialized {
            format!("Initialized cardflow at {}", self.data_dir)
        } else {
            format!("Already initialized at {}", self.data_dir)
        }];
        if !self.seeded_lists.is_empty() {
            lines.push(format!("Seeded lists: {}", self.seeded_lists.join(", ")));
        }
        lines.join("\n")
    }
}

/// Create the store if needed and seed any empty vocabulary list.
pub fn system_init(ctx: &Context) -> Result<InitResult> {
    let existed = SqliteStore::exists(&ctx.data_dir);
    let mut store = SqliteStore::init(&ctx.data_dir)?;
    let seeded = storage::seed_default_lists(&mut store)?;
    tracing::info!(path = %store.location(), seeded = seeded.len(), "store initialized");
    Ok(InitResult {
        initialized: !existed,
        data_dir: ctx.data_dir.display().to_string(),
        seeded_lists: seeded.iter().map(|k| k.as_str().to_string()).collect(),
    })
}

// === Projects and people ===

/// Arguments for [`project_create`].
#[derive(Debug, Clone, Default)]
pub struct ProjectInput {
    pub id: String,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub scale: Option<String>,
    pub default_validator: Option<String>,
}

#[derive(Serialize)]
pub struct ProjectResult {
    pub id: String,
    pub project: Project,
}

impl Output for ProjectResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let p = &self.project;
        let mut lines = vec![
            format!("{} ({})", self.id, p.name),
            format!("  abbreviation: {}", p.abbreviation_for(&self.id)),
            format!(
                "  scale: {}",
                p.scoring_system.as_deref().unwrap_or("(default)")
            ),
            format!("  developers: {}", p.developers.join(", ")),
            format!("  stakeholders: {}", p.stakeholders.join(", ")),
        ];
        if let Some(v) = &p.default_validator {
            lines.push(format!("  default validator: {}", v));
        }
        lines.join("\n")
    }
}

fn check_id_segment(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains('/') || id.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
            "Invalid {} id '{}': must be non-empty with no '/' or whitespace",
            what, id
        )));
    }
    Ok(())
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Other(format!("Expected an object, got {}", other))),
    }
}

pub fn project_create(ctx: &Context, input: ProjectInput) -> Result<ProjectResult> {
    check_id_segment("project", &input.id)?;
    let scoring_system = match input.scale.as_deref() {
        Some(raw) => Some(
            PointScale::parse(raw)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Invalid scale '{}': expected 1-5 or fibonacci",
                        raw
                    ))
                })?
                .as_str()
                .to_string(),
        ),
        None => None,
    };
    validate_reference(ReferenceRole::Stakeholder, input.default_validator.as_deref())?;

    let mut store = ctx.open_store()?;
    let path = storage::project_path(&input.id);
    if store.get(&path)?.is_some() {
        return Err(Error::InvalidInput(format!(
            "Project {} already exists",
            input.id
        )));
    }

    let project = Project {
        name: input.name.unwrap_or_else(|| input.id.clone()),
        abbreviation: input.abbreviation.filter(|a| !a.trim().is_empty()),
        scoring_system,
        default_validator: input.default_validator.filter(|v| !v.trim().is_empty()),
        ..Default::default()
    };
    store.set(&path, &to_document(&project)?)?;
    tracing::info!(project = %input.id, "project created");
    Ok(ProjectResult {
        id: input.id,
        project,
    })
}

pub fn project_show(ctx: &Context, id: &str) -> Result<ProjectResult> {
    let store = ctx.open_store()?;
    let doc = store
        .get(&storage::project_path(id))?
        .ok_or_else(|| Error::NotFound(format!("project {}", id)))?;
    Ok(ProjectResult {
        id: id.to_string(),
        project: serde_json::from_value(Value::Object(doc))?,
    })
}

/// Arguments for [`person_add`].
#[derive(Debug, Clone)]
pub struct PersonInput {
    pub id: String,
    pub name: String,
    pub email: String,
    pub active: bool,
    /// Project whose roster the person joins.
    pub project: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PersonResult {
    pub id: String,
    pub role: &'static str,
    pub person: Person,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Output for PersonResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut line = format!(
            "Saved {} {} ({} <{}>)",
            self.role, self.id, self.person.name, self.person.email
        );
        if !self.person.active {
            line.push_str(" [inactive]");
        }
        if let Some(p) = &self.project {
            line.push_str(&format!(", member of {}", p));
        }
        line
    }
}

/// Add or replace a developer or stakeholder, optionally joining a project.
pub fn person_add(ctx: &Context, role: ReferenceRole, input: PersonInput) -> Result<PersonResult> {
    let (path, roster, role_name) = match role {
        ReferenceRole::Developer | ReferenceRole::Codeveloper => (
            storage::developer_path(&input.id),
            "developers",
            "developer",
        ),
        ReferenceRole::Validator | ReferenceRole::Stakeholder => (
            storage::stakeholder_path(&input.id),
            "stakeholders",
            "stakeholder",
        ),
    };
    validate_reference(role, Some(input.id.as_str()))?;
    check_id_segment(role_name, &input.id)?;

    let mut store = ctx.open_store()?;
    let person = Person {
        name: input.name,
        email: input.email,
        active: input.active,
    };

    // Check the project before writing anything.
    let membership = match &input.project {
        Some(project_id) => {
            let project_path = storage::project_path(project_id);
            let project = store
                .get(&project_path)?
                .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))?;
            let mut members: Vec<Value> = project
                .get(roster)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if !members.iter().any(|m| m.as_str() == Some(input.id.as_str())) {
                members.push(Value::String(input.id.clone()));
            }
            let mut patch = Document::new();
            patch.insert(roster.to_string(), Value::Array(members));
            Some((project_path, patch))
        }
        None => None,
    };

    store.set(&path, &to_document(&person)?)?;
    if let Some((project_path, patch)) = membership {
        store.merge(&project_path, &patch)?;
    }
    tracing::info!(id = %input.id, role = role_name, "directory entry saved");

    Ok(PersonResult {
        id: input.id,
        role: role_name,
        person,
        project: input.project,
    })
}

// === Cards ===

impl Output for CreateOutcome {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Created {}", self.card_id)];
        for effect in &self.side_effects {
            lines.push(format!(
                "  set {} = {} ({})",
                effect.field,
                inline(&effect.value),
                effect.reason
            ));
        }
        for warning in &self.warnings {
            lines.push(format!("  warning: {}", warning));
        }
        lines.join("\n")
    }
}

impl Output for ValidationReport {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![if self.valid {
            "Valid: no rule violations".to_string()
        } else {
            format!("Invalid: {} violation(s)", self.violations.len())
        }];
        for v in &self.violations {
            lines.push(format!("  - {}", v));
            if !v.missing.is_empty() {
                lines.push(format!("      missing: {}", v.missing.join(", ")));
            }
            if !v.expected.is_empty() {
                lines.push(format!("      expected: {}", v.expected.join(", ")));
            }
        }
        for warning in &self.warnings {
            lines.push(format!("  warning: {}", warning));
        }
        lines.join("\n")
    }
}

impl Output for UpdateOutcome {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match self {
            UpdateOutcome::Report(report) => report.to_human(),
            UpdateOutcome::Applied(applied) => {
                let mut lines = vec![format!(
                    "Updated {}: {}",
                    applied.card_id,
                    applied.updated_fields.join(", ")
                )];
                for effect in &applied.side_effects {
                    lines.push(format!(
                        "  set {} = {} ({})",
                        effect.field,
                        inline(&effect.value),
                        effect.reason
                    ));
                }
                for warning in &applied.warnings {
                    lines.push(format!("  warning: {}", warning));
                }
                lines.join("\n")
            }
        }
    }
}

/// A create either writes a card or, validate-only, reports on it.
#[derive(Serialize)]
#[serde(untagged)]
pub enum CreateResult {
    Created(CreateOutcome),
    Report(ValidationReport),
}

impl Output for CreateResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match self {
            CreateResult::Created(c) => c.to_human(),
            CreateResult::Report(r) => r.to_human(),
        }
    }
}

/// Where a card lives and who acts on it.
#[derive(Debug, Clone)]
pub struct CardTarget<'a> {
    pub project: &'a str,
    pub card_type: CardType,
    pub user: Option<&'a str>,
}

pub fn card_create(
    ctx: &Context,
    target: CardTarget<'_>,
    fields: Document,
    validate_only: bool,
) -> Result<CreateResult> {
    let mut store = ctx.open_store()?;
    let mut engine = CardEngine::new(&mut store, ctx.lists(), ctx.settings(target.user));
    if validate_only {
        let report = engine.validate_create(target.project, target.card_type, &fields)?;
        return Ok(CreateResult::Report(report));
    }
    let outcome = engine.create_card(target.project, target.card_type, fields)?;
    Ok(CreateResult::Created(outcome))
}

pub fn card_update(
    ctx: &Context,
    target: CardTarget<'_>,
    id_or_key: &str,
    patch: Document,
    validate_only: bool,
) -> Result<UpdateOutcome> {
    if patch.is_empty() {
        return Err(Error::InvalidInput(
            "Nothing to update: pass --set key=value or --json".to_string(),
        ));
    }
    let mode = if validate_only {
        Mode::ValidateOnly
    } else {
        Mode::Apply
    };
    let mut store = ctx.open_store()?;
    let mut engine = CardEngine::new(&mut store, ctx.lists(), ctx.settings(target.user));
    engine.update_card(target.project, target.card_type, id_or_key, patch, mode)
}

#[derive(Serialize)]
pub struct CardView {
    pub key: String,
    pub card: Document,
}

impl Output for CardView {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let id = self
            .card
            .get("cardId")
            .and_then(Value::as_str)
            .unwrap_or(&self.key);
        let mut lines = vec![format!("{} (key {})", id, self.key)];
        lines.extend(render_document(&self.card, "  "));
        lines.join("\n")
    }
}

pub fn card_show(
    ctx: &Context,
    project: &str,
    card_type: CardType,
    id_or_key: &str,
) -> Result<CardView> {
    let store = ctx.open_store()?;
    let (key, card) = storage::find_card(&store, project, card_type, id_or_key)?;
    Ok(CardView { key, card })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub key: String,
    pub card_id: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardList {
    pub project: String,
    pub card_type: CardType,
    pub count: usize,
    pub cards: Vec<CardSummary>,
}

impl Output for CardList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.cards.is_empty() {
            return format!("No {} cards in {}", self.card_type, self.project);
        }
        let mut lines = vec![format!(
            "{} {} card(s) in {}:",
            self.count, self.card_type, self.project
        )];
        for c in &self.cards {
            lines.push(format!(
                "  {} [{}] {} (priority {})",
                c.card_id.as_deref().unwrap_or(&c.key),
                c.status.as_deref().unwrap_or("-"),
                c.title.as_deref().unwrap_or(""),
                inline(&c.priority)
            ));
        }
        lines.join("\n")
    }
}

pub fn card_list(ctx: &Context, project: &str, card_type: CardType) -> Result<CardList> {
    let store = ctx.open_store()?;
    let text = |doc: &Document, field: &str| doc.get(field).and_then(Value::as_str).map(str::to_string);
    let cards: Vec<CardSummary> = store
        .list(&storage::cards_path(project, card_type))?
        .into_iter()
        .map(|(key, doc)| CardSummary {
            card_id: text(&doc, "cardId"),
            title: text(&doc, "title"),
            status: text(&doc, "status"),
            priority: doc.get("priority").cloned().unwrap_or(Value::Null),
            key,
        })
        .collect();
    Ok(CardList {
        project: project.to_string(),
        card_type,
        count: cards.len(),
        cards,
    })
}

impl Output for AvailableTransitions {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} in status {}",
            self.card_type,
            self.current_status.as_deref().unwrap_or("(none)")
        )];
        if self.targets.is_empty() {
            lines.push("  no workflow for this card type".to_string());
        }
        for t in &self.targets {
            let mark = if t.allowed { "ok" } else { "no" };
            match &t.reason {
                Some(reason) => lines.push(format!("  [{}] {}: {}", mark, t.status, reason)),
                None => lines.push(format!("  [{}] {}", mark, t.status)),
            }
        }
        lines.join("\n")
    }
}

pub fn card_transitions(
    ctx: &Context,
    project: &str,
    card_type: CardType,
    id_or_key: &str,
) -> Result<AvailableTransitions> {
    let store = ctx.open_store()?;
    let (_, card) = storage::find_card(&store, project, card_type, id_or_key)?;
    Ok(available_transitions(card_type, &card))
}

// === Introspection ===

impl Output for TransitionRules {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Workflow for {}", self.card_type)];
        if self.valid_statuses.is_empty() {
            lines.push("  no status workflow".to_string());
        } else {
            lines.push(format!("  statuses: {}", self.valid_statuses.join(", ")));
        }
        if let Some(initial) = self.initial_status {
            lines.push(format!("  initial: {}", initial));
        }
        for entry in &self.transition_table {
            lines.push(format!("  {} -> {}", entry.from, entry.to.join(", ")));
        }
        for req in &self.required_fields_per_transition {
            lines.push(format!(
                "  {} -> {} requires {}",
                req.from,
                req.to,
                req.fields.join(", ")
            ));
        }
        if !self.validator_only.is_empty() {
            lines.push(format!(
                "  validator only: {}",
                self.validator_only.join(", ")
            ));
        }
        for note in &self.notes {
            lines.push(format!("  note: {}", note));
        }
        lines.join("\n")
    }
}

pub fn rules(card_type: CardType) -> TransitionRules {
    transition_rules(card_type)
}

#[derive(Serialize)]
pub struct PriorityTable {
    pub scale: PointScale,
    pub entries: Vec<PriorityEntry>,
}

impl Output for PriorityTable {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Priority table ({} scale)", self.scale)];
        lines.push("  rank  business  effort  ratio".to_string());
        for e in &self.entries {
            lines.push(format!(
                "  {:>4}  {:>8}  {:>6}  {:>6.1}",
                e.rank, e.business_value, e.effort, e.ratio
            ));
        }
        lines.join("\n")
    }
}

pub fn priority_table_for(scale: PointScale) -> PriorityTable {
    PriorityTable {
        scale,
        entries: priority_table(scale).to_vec(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityResult {
    pub business_points: Option<u32>,
    pub dev_points: Option<u32>,
    pub scale: PointScale,
    pub priority: Option<u32>,
}

impl Output for PriorityResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match self.priority {
            Some(p) => format!("Priority {} ({} scale)", p, self.scale),
            None => "No priority: business and dev points are both needed".to_string(),
        }
    }
}

/// Scale for a priority calculation: explicit, else the project's, else
/// the configured default.
pub fn priority_scale(
    ctx: &Context,
    explicit: Option<PointScale>,
    project: Option<&str>,
) -> Result<PointScale> {
    let fallback = ctx.config.priority_scale.value;
    if let Some(scale) = explicit {
        return Ok(scale);
    }
    match project {
        Some(id) => Ok(project_show(ctx, id)?.project.scale(fallback)),
        None => Ok(fallback),
    }
}

pub fn priority_calc(business: Option<u32>, effort: Option<u32>, scale: PointScale) -> Result<PriorityResult> {
    for (field, value) in [("businessPoints", business), ("devPoints", effort)] {
        if let Some(points) = value {
            if !scale.contains(points) {
                return Err(Error::InvalidInput(format!(
                    "{} {} is not on the {} scale ({})",
                    field,
                    points,
                    scale,
                    scale
                        .values()
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
    }
    Ok(PriorityResult {
        business_points: business,
        dev_points: effort,
        scale,
        priority: calculate_priority(business, effort, scale),
    })
}

#[derive(Serialize)]
pub struct ListView {
    pub kind: ListKind,
    pub values: Vec<String>,
}

impl Output for ListView {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{}:", self.kind)];
        lines.extend(self.values.iter().map(|v| format!("  {}", v)));
        lines.join("\n")
    }
}

pub fn lists_show(ctx: &Context, kind: ListKind) -> Result<ListView> {
    let store = ctx.open_store()?;
    let values = ctx.lists().list_texts(&store, kind)?;
    Ok(ListView {
        kind,
        values: values.as_ref().clone(),
    })
}

#[derive(Serialize)]
pub struct Invalidated {
    pub invalidated: Vec<ListKind>,
}

impl Output for Invalidated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let names: Vec<&str> = self.invalidated.iter().map(|k| k.as_str()).collect();
        format!("Invalidated cached lists: {}", names.join(", "))
    }
}

/// Drop cached vocabulary so the next read goes to the store.
pub fn lists_invalidate(ctx: &Context, kind: Option<ListKind>) -> Invalidated {
    ctx.lists().invalidate(kind);
    tracing::debug!(kind = ?kind, "vocabulary cache invalidated");
    Invalidated {
        invalidated: match kind {
            Some(k) => vec![k],
            None => ListKind::all().to_vec(),
        },
    }
}

// === Config ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub data_dir: String,
    pub config: ResolvedConfig,
}

impl Output for ConfigView {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![format!("data-dir = {}", self.data_dir)];
        match &c.default_project {
            Some(p) => lines.push(format!("default-project = {} ({})", p.value, p.source)),
            None => lines.push("default-project = (unset)".to_string()),
        }
        lines.push(format!(
            "priority-scale = {} ({})",
            c.priority_scale.value, c.priority_scale.source
        ));
        lines.push(format!(
            "vocabulary-ttl-secs = {} ({})",
            c.vocabulary_ttl_secs.value, c.vocabulary_ttl_secs.source
        ));
        lines.push(format!(
            "output-format = {} ({})",
            c.output_format.value, c.output_format.source
        ));
        lines.push(format!(
            "action-log = {} ({})",
            c.action_log.value, c.action_log.source
        ));
        lines.push(format!("user = {} ({})", c.user.value, c.user.source));
        lines.join("\n")
    }
}

pub fn config_show(ctx: &Context) -> ConfigView {
    ConfigView {
        data_dir: ctx.data_dir.display().to_string(),
        config: ctx.config.clone(),
    }
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path)
    }
}

/// Write one key to the data directory's config.kdl.
pub fn config_set(data_dir: &Path, key: &str, value: &str) -> Result<ConfigSet> {
    let path = config::data_config_path(data_dir);
    let mut cfg = CardflowConfig::load(&path)?;
    cfg.set_key(key, value)?;
    cfg.save(&path)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path: path.display().to_string(),
    })
}
