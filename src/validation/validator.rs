//! Config Validator - composition root
//!
//! Runs enum validation, storage normalization, admission limits and the
//! cross-field checks in that order, collecting every fatal error before
//! giving up. A configuration that passes comes back as a
//! [`CanonicalConfig`] together with the advisories raised on the way.

use crate::crd::image_registry::{
    ImageRegistryConfig, ImageRegistryConfigProxy, ImageRegistryConfigRoute, ImageRegistrySpec,
    ImageRegistryStatus,
};
use crate::domain::advisory::Advisory;
use crate::domain::management::{ManagementState, StorageManagementState};
use crate::error::{ValidationError, ValidationErrors};
use crate::validation::admission::{normalize_requests, AdmissionLimits};
use crate::validation::normalizer::{
    normalize_log_level, normalize_storage, CanonicalStorage, LogLevel,
};
use k8s_openapi::api::core::v1::{Affinity, ResourceRequirements, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use tracing::{debug, warn};

// =============================================================================
// Validator Configuration
// =============================================================================

/// Tunables of the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorConfig {
    /// Most replicas allowed on ephemeral (emptyDir) storage
    pub max_ephemeral_replicas: i32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_ephemeral_replicas: 1,
        }
    }
}

// =============================================================================
// Rollout Strategy
// =============================================================================

/// Deployment rollout strategy for the registry pods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RolloutStrategy {
    RollingUpdate,
    Recreate,
}

impl RolloutStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutStrategy::RollingUpdate => "RollingUpdate",
            RolloutStrategy::Recreate => "Recreate",
        }
    }
}

impl FromStr for RolloutStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RollingUpdate" => Ok(RolloutStrategy::RollingUpdate),
            "Recreate" => Ok(RolloutStrategy::Recreate),
            _ => Err(ValidationError::InvalidRolloutStrategy {
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RolloutStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Canonical Configuration
// =============================================================================

/// A validated configuration with every deprecated field resolved
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalConfig {
    pub management_state: ManagementState,
    /// Explicit or migrated operand log level; `None` means Normal
    pub log_level: Option<LogLevel>,
    pub operator_log_level: Option<LogLevel>,
    /// Deprecated numeric level, kept verbatim for write-back
    pub logging: i64,
    /// Empty until generated
    pub http_secret: String,
    pub proxy: ImageRegistryConfigProxy,
    pub storage: CanonicalStorage,
    pub read_only: bool,
    pub disable_redirect: bool,
    pub requests: AdmissionLimits,
    pub default_route: bool,
    pub routes: Vec<ImageRegistryConfigRoute>,
    pub replicas: u32,
    pub rollout_strategy: Option<RolloutStrategy>,
    pub resources: Option<ResourceRequirements>,
    pub node_selector: BTreeMap<String, String>,
    pub tolerations: Vec<Toleration>,
    pub affinity: Option<Affinity>,
}

impl CanonicalConfig {
    /// Effective operand log level
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or(LogLevel::Normal)
    }

    /// Storage management state, if decided
    pub fn storage_management_state(&self) -> Option<StorageManagementState> {
        self.storage.management_state
    }

    /// Write the canonical form back to the wire shape
    pub fn to_spec(&self) -> ImageRegistrySpec {
        let level = |l: Option<LogLevel>| l.map(|l| l.as_str().to_string()).unwrap_or_default();
        ImageRegistrySpec {
            management_state: self.management_state.as_str().to_string(),
            log_level: level(self.log_level),
            operator_log_level: level(self.operator_log_level),
            http_secret: self.http_secret.clone(),
            proxy: self.proxy.clone(),
            storage: self.storage.to_storage(),
            read_only: self.read_only,
            disable_redirect: self.disable_redirect,
            requests: self.requests.to_wire(),
            default_route: self.default_route,
            routes: self.routes.clone(),
            replicas: i32::try_from(self.replicas).unwrap_or(i32::MAX),
            logging: self.logging,
            resources: self.resources.clone(),
            node_selector: self.node_selector.clone(),
            tolerations: self.tolerations.clone(),
            rollout_strategy: self
                .rollout_strategy
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            affinity: self.affinity.clone(),
        }
    }
}

/// Successful validation result
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub config: CanonicalConfig,
    pub advisories: Vec<Advisory>,
}

// =============================================================================
// Validator
// =============================================================================

/// Validates and normalizes registry configurations
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a whole Config resource
    pub fn validate_resource(
        &self,
        resource: &ImageRegistryConfig,
    ) -> Result<Validated, ValidationErrors> {
        self.validate(&resource.spec, resource.status.as_ref())
    }

    /// Validate a spec, migrating deprecated fields from `status` if given.
    ///
    /// Neither argument is modified.
    pub fn validate(
        &self,
        spec: &ImageRegistrySpec,
        status: Option<&ImageRegistryStatus>,
    ) -> Result<Validated, ValidationErrors> {
        let mut errors = Vec::new();
        let mut advisories = Vec::new();

        // Enumerations
        let management_state =
            ManagementState::parse_field("spec.managementState", &spec.management_state)
                .map_err(|e| errors.push(e))
                .ok();

        let rollout_strategy = if spec.rollout_strategy.is_empty() {
            None
        } else {
            spec.rollout_strategy
                .parse::<RolloutStrategy>()
                .map_err(|e| errors.push(e))
                .ok()
        };

        let log_level = normalize_log_level(&spec.log_level, spec.logging)
            .map(|n| n.drain_into(&mut advisories))
            .map_err(|e| errors.push(e))
            .ok()
            .flatten();

        let operator_log_level =
            LogLevel::parse_field("spec.operatorLogLevel", &spec.operator_log_level)
                .map_err(|e| errors.push(e))
                .ok()
                .flatten();

        // Storage
        let legacy_storage_managed = status
            .filter(|s| s.storage.management_state.is_empty())
            .map(|s| s.storage_managed);
        let storage = match normalize_storage(&spec.storage, legacy_storage_managed) {
            Ok(normalized) => Some(normalized.drain_into(&mut advisories)),
            Err(e) => {
                errors.extend(e);
                None
            }
        };

        // Admission limits
        let requests = normalize_requests(&spec.requests).drain_into(&mut advisories);

        // Cross-field checks
        let replicas = match u32::try_from(spec.replicas) {
            Ok(replicas) => Some(replicas),
            Err(_) => {
                errors.push(ValidationError::InvalidReplicas {
                    replicas: spec.replicas,
                });
                None
            }
        };

        if storage.as_ref().is_some_and(CanonicalStorage::is_ephemeral)
            && spec.replicas > self.config.max_ephemeral_replicas
        {
            errors.push(ValidationError::ReplicasExceedEphemeralLimit {
                replicas: spec.replicas,
                limit: self.config.max_ephemeral_replicas,
            });
        }

        errors.extend(check_routes(&spec.routes));
        errors.extend(check_proxy(&spec.proxy));

        if let Some(errors) = ValidationErrors::from_vec(errors) {
            debug!(errors = errors.len(), "Configuration rejected");
            return Err(errors);
        }

        // Every `None` below has a matching entry in `errors`.
        let management_state = management_state.unwrap_or(ManagementState::Unmanaged);
        let storage = storage.unwrap_or_default();
        let replicas = replicas.unwrap_or_default();

        debug!(
            management_state = %management_state,
            backend = storage.kind().map(|k| k.field_name()).unwrap_or("unset"),
            replicas,
            "Configuration normalized"
        );
        for advisory in &advisories {
            warn!(kind = %advisory.kind, field = %advisory.field, "{}", advisory.message);
        }

        Ok(Validated {
            config: CanonicalConfig {
                management_state,
                log_level,
                operator_log_level,
                logging: spec.logging,
                http_secret: spec.http_secret.clone(),
                proxy: spec.proxy.clone(),
                storage,
                read_only: spec.read_only,
                disable_redirect: spec.disable_redirect,
                requests,
                default_route: spec.default_route,
                routes: spec.routes.clone(),
                replicas,
                rollout_strategy,
                resources: spec.resources.clone(),
                node_selector: spec.node_selector.clone(),
                tolerations: spec.tolerations.clone(),
                affinity: spec.affinity.clone(),
            },
            advisories,
        })
    }
}

/// Validate with the default [`ValidatorConfig`]
pub fn validate(
    spec: &ImageRegistrySpec,
    status: Option<&ImageRegistryStatus>,
) -> Result<Validated, ValidationErrors> {
    Validator::default().validate(spec, status)
}

fn check_routes(routes: &[ImageRegistryConfigRoute]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for (index, route) in routes.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::MissingRouteName { index });
            continue;
        }
        if !seen.insert(route.name.as_str()) && reported.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName {
                name: route.name.clone(),
            });
        }
    }
    errors
}

fn check_proxy(proxy: &ImageRegistryConfigProxy) -> Vec<ValidationError> {
    [("spec.proxy.http", &proxy.http), ("spec.proxy.https", &proxy.https)]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(field, value)| {
            let reason = match url::Url::parse(value) {
                Ok(url) if url.has_host() => return None,
                Ok(_) => "URL has no host".to_string(),
                Err(e) => e.to_string(),
            };
            Some(ValidationError::InvalidProxyUrl {
                field: field.to_string(),
                value: value.clone(),
                reason,
            })
        })
        .collect()
}
