//! Projects and the people cards refer to.

use super::PointScale;
use serde::{Deserialize, Serialize};

/// A developer or stakeholder directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Person {
    /// Stable identity used to match people across directories.
    pub fn identity(&self) -> Option<Identity> {
        Identity::from_email(&self.email)
    }
}

/// Contact identity of a person: a normalized email address.
///
/// Display names are not identities; two entries are the same person only
/// when their addresses match after trimming and lowercasing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn from_email(email: &str) -> Option<Self> {
        let normalized = email.trim().to_lowercase();
        if normalized.is_empty() || !normalized.contains('@') {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Project settings relevant to card validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,

    /// Prefix for card ids; derived from the project id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,

    /// "1-5" or "fibonacci"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_system: Option<String>,

    #[serde(default)]
    pub developers: Vec<String>,

    #[serde(default)]
    pub stakeholders: Vec<String>,

    /// Stakeholder that approves tasks when no better match exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_validator: Option<String>,
}

impl Project {
    /// Card id prefix for this project.
    pub fn abbreviation_for(&self, project_id: &str) -> String {
        match self.abbreviation.as_deref().map(str::trim) {
            Some(abbr) if !abbr.is_empty() => abbr.to_uppercase(),
            _ => derive_abbreviation(project_id),
        }
    }

    /// The project's point scale, or `fallback` when unset or unrecognized.
    pub fn scale(&self, fallback: PointScale) -> PointScale {
        self.scoring_system
            .as_deref()
            .and_then(PointScale::parse)
            .unwrap_or(fallback)
    }
}

/// First three alphanumeric characters of the project id, uppercased.
pub fn derive_abbreviation(project_id: &str) -> String {
    project_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase()
}
