//! Reference lookup for controlled vocabularies.
//!
//! Lists (task statuses, bug statuses, bug priorities) live in the store
//! under `lists/{kind}` as `{text, order}` entries. [`ListService`] reads
//! them through a [`VocabularyCache`] that keeps each list for a fixed TTL.
//! The cache is an explicit value owned by whoever builds the service (the
//! CLI process or the tool server), not a global.

use crate::engine::{Violation, ViolationKind};
use crate::models::{BugStatus, Document, TaskStatus};
use crate::storage::DocumentStore;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default time a loaded list stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Controlled vocabulary lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListKind {
    #[serde(rename = "taskStatus")]
    TaskStatus,
    #[serde(rename = "bugStatus")]
    BugStatus,
    #[serde(rename = "bugPriority")]
    BugPriority,
}

impl ListKind {
    pub fn all() -> &'static [ListKind] {
        &[ListKind::TaskStatus, ListKind::BugStatus, ListKind::BugPriority]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::TaskStatus => "taskStatus",
            ListKind::BugStatus => "bugStatus",
            ListKind::BugPriority => "bugPriority",
        }
    }

    /// Collection path of the list entries.
    pub fn path(&self) -> String {
        format!("lists/{}", self.as_str())
    }

    /// Texts seeded by `cf system init`.
    pub fn defaults(&self) -> Vec<&'static str> {
        match self {
            ListKind::TaskStatus => TaskStatus::all().iter().map(|s| s.as_str()).collect(),
            ListKind::BugStatus => BugStatus::all().iter().map(|s| s.as_str()).collect(),
            ListKind::BugPriority => vec![
                "Application Blocker",
                "Department Blocker",
                "Individual Blocker",
                "User Experience Issue",
                "Workflow Improvement",
                "Workaround Available Issue",
            ],
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ListKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ListKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownListKind(s.to_string()))
    }
}

/// Anything that can produce the raw entries of a list.
pub trait ListSource {
    /// Load the texts of `kind`, ordered by their stored rank.
    fn load_list(&self, kind: ListKind) -> Result<Vec<String>>;
}

impl<S: DocumentStore + ?Sized> ListSource for S {
    fn load_list(&self, kind: ListKind) -> Result<Vec<String>> {
        let mut entries: Vec<(Option<f64>, String)> = self
            .list(&kind.path())?
            .into_iter()
            .filter_map(|(_, doc)| entry_text(&doc).map(|text| (entry_order(&doc), text)))
            .collect();
        // Stable sort: unranked entries keep stored order, after ranked ones.
        entries.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(entries.into_iter().map(|(_, text)| text).collect())
    }
}

fn entry_text(doc: &Document) -> Option<String> {
    doc.get("text")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn entry_order(doc: &Document) -> Option<f64> {
    doc.get("order").and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone)]
struct CachedList {
    texts: Arc<Vec<String>>,
    loaded_at: Instant,
}

/// Time-bounded cache of loaded lists.
///
/// Expiry is checked on read. Refreshes overwrite whatever is cached
/// (last write wins); reloading is idempotent so no coordination beyond
/// the map lock is needed.
#[derive(Debug)]
pub struct VocabularyCache {
    ttl: Duration,
    entries: Mutex<HashMap<ListKind, CachedList>>,
}

impl VocabularyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached texts for `kind`, if present and not expired.
    pub fn get(&self, kind: ListKind) -> Option<Arc<Vec<String>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&kind)
            .filter(|cached| cached.loaded_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.texts))
    }

    pub fn put(&self, kind: ListKind, texts: Vec<String>) -> Arc<Vec<String>> {
        let texts = Arc::new(texts);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            kind,
            CachedList {
                texts: Arc::clone(&texts),
                loaded_at: Instant::now(),
            },
        );
        texts
    }

    pub fn invalidate(&self, kind: ListKind) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&kind);
        tracing::debug!(list = %kind, "vocabulary cache invalidated");
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        tracing::debug!("vocabulary cache cleared");
    }
}

impl Default for VocabularyCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Resolves canonical vocabulary values.
#[derive(Debug, Clone)]
pub struct ListService {
    cache: Arc<VocabularyCache>,
}

impl ListService {
    pub fn new(cache: Arc<VocabularyCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &VocabularyCache {
        &self.cache
    }

    /// Texts of `kind` in rank order.
    ///
    /// Fails with [`Error::EmptyVocabularySource`] when the list is missing
    /// or empty; there is no built-in fallback.
    pub fn list_texts<S: ListSource + ?Sized>(
        &self,
        source: &S,
        kind: ListKind,
    ) -> Result<Arc<Vec<String>>> {
        if let Some(texts) = self.cache.get(kind) {
            return Ok(texts);
        }
        let texts = source.load_list(kind)?;
        if texts.is_empty() {
            return Err(Error::EmptyVocabularySource(kind.as_str().to_string()));
        }
        tracing::debug!(list = %kind, entries = texts.len(), "vocabulary loaded");
        Ok(self.cache.put(kind, texts))
    }

    /// Canonical text for `candidate`: exact match first, then a
    /// case-insensitive match. `None` when nothing matches.
    pub fn resolve<S: ListSource + ?Sized>(
        &self,
        source: &S,
        kind: ListKind,
        candidate: &str,
    ) -> Result<Option<String>> {
        let texts = self.list_texts(source, kind)?;
        if let Some(exact) = texts.iter().find(|t| t.as_str() == candidate) {
            return Ok(Some(exact.clone()));
        }
        let wanted = candidate.trim().to_lowercase();
        Ok(texts.iter().find(|t| t.to_lowercase() == wanted).cloned())
    }

    /// Exact-match membership. Stricter than [`ListService::resolve`].
    pub fn is_valid<S: ListSource + ?Sized>(
        &self,
        source: &S,
        kind: ListKind,
        value: &str,
    ) -> Result<bool> {
        Ok(self.list_texts(source, kind)?.iter().any(|t| t == value))
    }

    /// Resolve `candidate` for `field`, rejecting values outside the list.
    pub fn canonicalize<S: ListSource + ?Sized>(
        &self,
        source: &S,
        kind: ListKind,
        field: &str,
        candidate: &str,
    ) -> Result<String> {
        match self.resolve(source, kind, candidate)? {
            Some(canonical) => Ok(canonical),
            None => {
                let valid = self.list_texts(source, kind)?;
                Err(Violation::new(
                    ViolationKind::InvalidVocabularyValue,
                    format!(
                        "Invalid {} '{}'. Valid values: {}",
                        field,
                        candidate,
                        valid.join(", ")
                    ),
                )
                .with_field(field)
                .with_expected(valid.iter().cloned())
                .with_actual(candidate)
                .into())
            }
        }
    }

    /// Drop one cached list, or all of them.
    pub fn invalidate(&self, kind: Option<ListKind>) {
        match kind {
            Some(kind) => self.cache.invalidate(kind),
            None => self.cache.invalidate_all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::test_utils::{doc, list_service, seeded_store};
    use serde_json::json;
    use std::cell::Cell;

    /// Source that counts loads.
    struct CountingSource {
        texts: Vec<String>,
        loads: Cell<usize>,
    }

    impl CountingSource {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|s| s.to_string()).collect(),
                loads: Cell::new(0),
            }
        }
    }

    impl ListSource for CountingSource {
        fn load_list(&self, _kind: ListKind) -> Result<Vec<String>> {
            self.loads.set(self.loads.get() + 1);
            Ok(self.texts.clone())
        }
    }

    #[test]
    fn test_list_kind_from_str() {
        assert_eq!("taskStatus".parse::<ListKind>().unwrap(), ListKind::TaskStatus);
        assert_eq!("BUGPRIORITY".parse::<ListKind>().unwrap(), ListKind::BugPriority);
        assert!(matches!(
            "epicStatus".parse::<ListKind>(),
            Err(Error::UnknownListKind(_))
        ));
    }

    #[test]
    fn test_list_texts_ordered_by_rank() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for (key, text, order) in [("a", "Third", 3), ("b", "First", 1), ("c", "Second", 2)] {
            store
                .set(
                    &format!("lists/bugStatus/{key}"),
                    &doc(json!({"text": text, "order": order})),
                )
                .unwrap();
        }
        let service = list_service();
        let texts = service.list_texts(&store, ListKind::BugStatus).unwrap();
        assert_eq!(*texts, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let service = list_service();
        assert!(matches!(
            service.list_texts(&store, ListKind::TaskStatus),
            Err(Error::EmptyVocabularySource(kind)) if kind == "taskStatus"
        ));
    }

    #[test]
    fn test_resolve_exact_then_case_insensitive() {
        let store = seeded_store();
        let service = list_service();
        assert_eq!(
            service
                .resolve(&store, ListKind::TaskStatus, "In Progress")
                .unwrap()
                .as_deref(),
            Some("In Progress")
        );
        assert_eq!(
            service
                .resolve(&store, ListKind::TaskStatus, "in progress")
                .unwrap()
                .as_deref(),
            Some("In Progress")
        );
        assert_eq!(
            service.resolve(&store, ListKind::TaskStatus, "Doing").unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let store = seeded_store();
        let service = list_service();
        for candidate in ["to validate", "BLOCKED", "Reopened", "done&validated"] {
            let once = service
                .resolve(&store, ListKind::TaskStatus, candidate)
                .unwrap()
                .unwrap();
            let twice = service
                .resolve(&store, ListKind::TaskStatus, &once)
                .unwrap()
                .unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_is_valid_is_exact() {
        let store = seeded_store();
        let service = list_service();
        assert!(service.is_valid(&store, ListKind::BugStatus, "Fixed").unwrap());
        assert!(!service.is_valid(&store, ListKind::BugStatus, "fixed").unwrap());
    }

    #[test]
    fn test_canonicalize_rejects_with_alternatives() {
        let store = seeded_store();
        let service = list_service();
        let err = service
            .canonicalize(&store, ListKind::BugStatus, "status", "Done")
            .unwrap_err();
        let violation = err.violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::InvalidVocabularyValue);
        assert_eq!(violation.field.as_deref(), Some("status"));
        assert!(violation.expected.contains(&"Closed".to_string()));
        assert!(violation.message.contains("Done"));
    }

    #[test]
    fn test_cache_serves_until_invalidated() {
        let source = CountingSource::new(&["A", "B"]);
        let service = list_service();

        service.list_texts(&source, ListKind::BugPriority).unwrap();
        service.list_texts(&source, ListKind::BugPriority).unwrap();
        assert_eq!(source.loads.get(), 1);

        service.invalidate(Some(ListKind::BugPriority));
        service.list_texts(&source, ListKind::BugPriority).unwrap();
        assert_eq!(source.loads.get(), 2);

        service.list_texts(&source, ListKind::BugStatus).unwrap();
        service.invalidate(None);
        service.list_texts(&source, ListKind::BugPriority).unwrap();
        service.list_texts(&source, ListKind::BugStatus).unwrap();
        assert_eq!(source.loads.get(), 5);
    }

    #[test]
    fn test_expired_entries_are_reloaded() {
        let source = CountingSource::new(&["A"]);
        let service = ListService::new(Arc::new(VocabularyCache::new(Duration::ZERO)));

        service.list_texts(&source, ListKind::TaskStatus).unwrap();
        service.list_texts(&source, ListKind::TaskStatus).unwrap();
        assert_eq!(source.loads.get(), 2);
    }

    #[test]
    fn test_shared_cache_between_services() {
        let cache = Arc::new(VocabularyCache::default());
        let first = ListService::new(Arc::clone(&cache));
        let second = ListService::new(Arc::clone(&cache));
        let source = CountingSource::new(&["A"]);

        first.list_texts(&source, ListKind::TaskStatus).unwrap();
        second.list_texts(&source, ListKind::TaskStatus).unwrap();
        assert_eq!(source.loads.get(), 1);
    }
}
