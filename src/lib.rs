//! Image Registry Configuration Model
//!
//! Types, validation and normalization for the configuration of a
//! cluster-managed container image registry: which storage backend it uses,
//! how requests are admitted, how it is exposed and who owns its storage.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │              Config manifest (YAML / JSON, wire types)            │
//! └─────────────────────────────────┬────────────────────────────────┘
//!                                   │
//! ┌─────────────────────────────────┴────────────────────────────────┐
//! │                         Config Validator                          │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  Enumerations  │  │     Storage      │  │    Admission     │  │
//! │  │  & log levels  │  │    Normalizer    │  │      Limits      │  │
//! │  └────────────────┘  └──────────────────┘  └──────────────────┘  │
//! └─────────────────────────────────┬────────────────────────────────┘
//!                                   │ canonical config + advisories
//! ┌─────────────────────────────────┴────────────────────────────────┐
//! │         Reconciler (external)  ──►  Status Projector              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`crd`]: Config resource, spec, status and storage wire types
//! - [`domain`]: backends, management states, durations, advisories, ports
//! - [`validation`]: normalizer, admission limits, validator, status projector
//! - [`manifest`]: manifest loading
//! - [`error`]: Error types and handling

pub mod crd;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod validation;

// Re-export commonly used types
pub use crd::{
    ImageRegistryConfig, ImageRegistryConfigStorage, ImageRegistrySpec, ImageRegistryStatus,
    OperatorCondition, ConditionStatus, CONFIG_NAME,
};

pub use domain::{
    Advisory, AdvisoryKind, BackendKind, GoDuration, LifecycleAction, ManagementState,
    Normalized, SecretGenerator, StorageBackend, StorageManagementState, StorageOperation,
    is_permitted, plan_lifecycle,
};

pub use error::{Error, Result, ValidationError, ValidationErrors};

pub use manifest::{parse_manifest, read_manifest};

pub use validation::{
    CanonicalConfig, CanonicalStorage, LogLevel, ReconcileOutcome, Validated, Validator,
    ValidatorConfig, ensure_http_secret, project_status, validate,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
