//! Error types for the image registry configuration model
//!
//! Fatal validation problems are modelled as [`ValidationError`] and always
//! travel together in a [`ValidationErrors`] aggregate, so a rejected
//! submission reports every problem at once. [`Error`] is the crate-level
//! error used by parsing and I/O boundaries.

use crate::domain::backend::BackendKind;
use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Duration parse error: {0}")]
    DurationParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error was caused by the submitted configuration rather
    /// than by the environment reading it
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::DurationParse(_)
                | Error::JsonParse(_)
                | Error::YamlParse(_)
        )
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Validation Errors
// =============================================================================

/// A single fatal problem found in a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("multiple storage backends configured: {}", join_kinds(.backends))]
    MultipleBackendsConfigured { backends: Vec<BackendKind> },

    #[error("{field}: unknown management state {value:?}")]
    UnknownManagementState { field: String, value: String },

    #[error("{field}: unknown log level {value:?}")]
    UnknownLogLevel { field: String, value: String },

    #[error("rolloutStrategy: {value:?} is not one of RollingUpdate, Recreate")]
    InvalidRolloutStrategy { value: String },

    #[error("routes: duplicate route name {name:?}")]
    DuplicateRouteName { name: String },

    #[error("routes[{index}]: name is required")]
    MissingRouteName { index: usize },

    #[error("replicas: {replicas} replicas cannot share emptyDir storage (limit {limit})")]
    ReplicasExceedEphemeralLimit { replicas: i32, limit: i32 },

    #[error("replicas: {replicas} is negative")]
    InvalidReplicas { replicas: i32 },

    #[error("storage.s3.cloudFront: missing {}", .missing.join(", "))]
    IncompleteCloudFront { missing: Vec<&'static str> },

    #[error("storage.azure.container: {container:?} {reason}")]
    InvalidAzureContainer { container: String, reason: String },

    #[error("{field}: invalid proxy URL {value:?}: {reason}")]
    InvalidProxyUrl {
        field: String,
        value: String,
        reason: String,
    },
}

fn join_kinds(kinds: &[BackendKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered, non-empty list of fatal validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Wrap collected errors; returns `None` when nothing was collected
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "; {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
