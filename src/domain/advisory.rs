//! Advisory notices
//!
//! Non-fatal findings produced while normalizing a configuration. They are
//! returned next to the canonical value and never block normalization.

use serde::{Deserialize, Serialize};

/// Category of an advisory notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisoryKind {
    /// A negative admission limit was clamped to zero
    InvalidAdmissionLimit,
    /// A deprecated field disagrees with its replacement; the replacement wins
    DeprecatedFieldConflict,
    /// A deprecated field was migrated into its replacement
    DeprecatedFieldUsed,
    /// An absent field was given its documented default
    DefaultApplied,
    /// A field has no effect in this configuration and was dropped or ignored
    IgnoredField,
}

impl std::fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvisoryKind::InvalidAdmissionLimit => write!(f, "InvalidAdmissionLimit"),
            AdvisoryKind::DeprecatedFieldConflict => write!(f, "DeprecatedFieldConflict"),
            AdvisoryKind::DeprecatedFieldUsed => write!(f, "DeprecatedFieldUsed"),
            AdvisoryKind::DefaultApplied => write!(f, "DefaultApplied"),
            AdvisoryKind::IgnoredField => write!(f, "IgnoredField"),
        }
    }
}

/// A single advisory notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub kind: AdvisoryKind,
    /// Document path of the field concerned, e.g. `spec.requests.read.maxRunning`
    pub field: String,
    pub message: String,
}

impl Advisory {
    pub fn new(kind: AdvisoryKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.field, self.message)
    }
}

/// A normalized value with the advisories raised while producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub advisories: Vec<Advisory>,
}

impl<T> Normalized<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }

    pub fn with_advisories(value: T, advisories: Vec<Advisory>) -> Self {
        Self { value, advisories }
    }

    /// Move the advisories into `sink` and return the value
    pub fn drain_into(self, sink: &mut Vec<Advisory>) -> T {
        sink.extend(self.advisories);
        self.value
    }

    /// Number of advisories of the given kind
    pub fn count(&self, kind: AdvisoryKind) -> usize {
        self.advisories.iter().filter(|a| a.kind == kind).count()
    }
}
