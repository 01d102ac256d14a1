//! Violations and the validate-only report.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    InvalidVocabularyValue,
    InvalidReferenceFormat,
    ProtectedFieldViolation,
    MissingRequiredFields,
    InvalidTransition,
    ValidatorOnlyTransition,
    SprintNotFound,
    NoSprintsInProject,
    NoValidatorAssignable,
    NoStakeholdersInProject,
    DirectPriorityNotAllowed,
    InvalidSubdocument,
    EpicRequired,
    EpicNotFound,
    DirectCloseWithoutDocumentation,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::InvalidVocabularyValue => "InvalidVocabularyValue",
            ViolationKind::InvalidReferenceFormat => "InvalidReferenceFormat",
            ViolationKind::ProtectedFieldViolation => "ProtectedFieldViolation",
            ViolationKind::MissingRequiredFields => "MissingRequiredFields",
            ViolationKind::InvalidTransition => "InvalidTransition",
            ViolationKind::ValidatorOnlyTransition => "ValidatorOnlyTransition",
            ViolationKind::SprintNotFound => "SprintNotFound",
            ViolationKind::NoSprintsInProject => "NoSprintsInProject",
            ViolationKind::NoValidatorAssignable => "NoValidatorAssignable",
            ViolationKind::NoStakeholdersInProject => "NoStakeholdersInProject",
            ViolationKind::DirectPriorityNotAllowed => "DirectPriorityNotAllowed",
            ViolationKind::InvalidSubdocument => "InvalidSubdocument",
            ViolationKind::EpicRequired => "EpicRequired",
            ViolationKind::EpicNotFound => "EpicNotFound",
            ViolationKind::DirectCloseWithoutDocumentation => "DirectCloseWithoutDocumentation",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One broken rule, with enough detail for a caller to self-correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,

    /// Human-readable explanation naming the offending value.
    pub message: String,

    /// Field the rule applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Field names that must be filled (gate failures).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,

    /// Acceptable alternatives (valid statuses, known sprints, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected: Vec<String>,

    /// The value that was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            missing: Vec::new(),
            expected: Vec::new(),
            actual: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_missing<I, S>(mut self, missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing = missing.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expected<I, S>(mut self, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected = expected.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_actual(mut self, actual: impl Into<Value>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of a validate-only evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn kinds(&self) -> Vec<ViolationKind> {
        self.violations.iter().map(|v| v.kind).collect()
    }
}

/// How a failed rule is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Stop at the first violation and write nothing.
    #[default]
    Apply,
    /// Never write; gather every violation into a report.
    ValidateOnly,
}

/// Routes rule results according to [`Mode`].
///
/// Every rule returns a `Vec<Violation>` (empty when satisfied). In apply
/// mode the first non-empty result becomes an error; in validate-only mode
/// results accumulate.
#[derive(Debug, Default)]
pub(crate) struct Collector {
    mode: Mode,
    violations: Vec<Violation>,
}

impl Collector {
    pub(crate) fn new(mode: Mode) -> Self {
        Self {
            mode,
            violations: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, found: Vec<Violation>) -> Result<()> {
        let mut found = found.into_iter();
        let Some(first) = found.next() else {
            return Ok(());
        };
        match self.mode {
            Mode::Apply => Err(Error::Rejected(first)),
            Mode::ValidateOnly => {
                self.violations.push(first);
                self.violations.extend(found);
                Ok(())
            }
        }
    }

    pub(crate) fn record_one(&mut self, found: Option<Violation>) -> Result<()> {
        self.record(found.into_iter().collect())
    }

    /// Turn a rejection into a recorded violation; other errors propagate.
    pub(crate) fn absorb<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(Error::Rejected(v)) => {
                self.record(vec![v])?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub(crate) fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}
