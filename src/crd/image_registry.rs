//! Image registry Config CRD
//!
//! The cluster-scoped singleton describing the desired state of the image
//! registry (`spec`) and what is actually in effect (`status`). Enumerated
//! fields are kept as raw strings here so that invalid values survive
//! decoding and can be reported by the validator instead of failing the
//! whole document.

use crate::crd::storage::ImageRegistryConfigStorage;
use crate::domain::duration::GoDuration;
use crate::domain::management::StorageManagementState;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Affinity, ResourceRequirements, Toleration};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional name of the singleton Config object
pub const CONFIG_NAME: &str = "cluster";

// =============================================================================
// Config CRD
// =============================================================================

/// Configuration of the registry instance managed by the registry operator
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "imageregistry.operator.openshift.io",
    version = "v1",
    kind = "Config",
    root = "ImageRegistryConfig",
    plural = "configs",
    status = "ImageRegistryStatus",
    printcolumn = r#"{"name": "State", "type": "string", "jsonPath": ".spec.managementState"}"#,
    printcolumn = r#"{"name": "Replicas", "type": "integer", "jsonPath": ".spec.replicas"}"#,
    printcolumn = r#"{"name": "Storage", "type": "string", "jsonPath": ".status.storage.managementState"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistrySpec {
    /// Managed, Unmanaged or Removed
    #[serde(default)]
    pub management_state: String,

    /// Log level of the operand: Normal, Debug, Trace or TraceAll
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_level: String,

    /// Log level of the operator itself
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator_log_level: String,

    /// Secret securing uploads, generated when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_secret: String,

    /// Proxy used for upstream calls
    #[serde(default, skip_serializing_if = "ImageRegistryConfigProxy::is_empty")]
    pub proxy: ImageRegistryConfigProxy,

    /// Storage backend configuration
    #[serde(default, skip_serializing_if = "ImageRegistryConfigStorage::is_empty")]
    pub storage: ImageRegistryConfigStorage,

    /// Reject pushes and deletes
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    /// Route all blob data through the registry instead of redirecting
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_redirect: bool,

    /// Parallel request limits
    #[serde(default, skip_serializing_if = "ImageRegistryConfigRequests::is_empty")]
    pub requests: ImageRegistryConfigRequests,

    /// Expose the registry on the default generated route
    #[serde(default, skip_serializing_if = "is_false")]
    pub default_route: bool,

    /// Additional external routes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<ImageRegistryConfigRoute>,

    /// Number of registry pods
    #[serde(default)]
    pub replicas: i32,

    /// Deprecated, superseded by `logLevel`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub logging: i64,

    /// Resource requests and limits for the registry pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    /// RollingUpdate or Recreate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rollout_strategy: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Proxy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryConfigProxy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub https: String,

    /// Comma-separated hosts that bypass the proxy
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub no_proxy: String,
}

/// Read and write request limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageRegistryConfigRequests {
    #[serde(default, skip_serializing_if = "ImageRegistryConfigRequestsLimits::is_empty")]
    pub read: ImageRegistryConfigRequestsLimits,

    #[serde(default, skip_serializing_if = "ImageRegistryConfigRequestsLimits::is_empty")]
    pub write: ImageRegistryConfigRequestsLimits,
}

/// Running, queued and waiting limits for one request class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryConfigRequestsLimits {
    /// Maximum in-flight requests
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_running: i64,

    /// Maximum queued requests
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_in_queue: i64,

    /// Maximum time a request may wait in the queue before rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub max_wait_in_queue: Option<GoDuration>,
}

/// External route to the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryConfigRoute {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Secret holding the route's certificates
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state of the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryStatus {
    /// Generation of the spec last acted on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default)]
    pub ready_replicas: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<OperatorCondition>,

    /// Deprecated, mirrors `storage.managementState == Managed`
    #[serde(default)]
    pub storage_managed: bool,

    /// Storage configuration currently applied
    #[serde(default)]
    pub storage: ImageRegistryConfigStorage,

    /// Level of the operand that was last reconciled
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Generations of the workloads the operator last acted on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generations: Vec<GenerationStatus>,

    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub latest_available_revision: i32,
}

/// Last observed generation of a workload managed by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub group: String,
    pub resource: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub last_generation: i64,
    #[serde(default)]
    pub hash: String,
}

/// Condition reported in status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    /// Type of condition, e.g. Available
    pub r#type: String,
    /// Status: True, False, Unknown
    pub status: ConditionStatus,
    /// Last transition time
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Condition status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

// =============================================================================
// Default Value Functions
// =============================================================================

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

// =============================================================================
// Implementations
// =============================================================================

impl ImageRegistryConfig {
    /// Get the name of this config
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    /// Whether this is the conventional singleton
    pub fn is_singleton(&self) -> bool {
        self.name() == CONFIG_NAME
    }
}

impl ImageRegistryConfigProxy {
    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.https.is_empty() && self.no_proxy.is_empty()
    }
}

impl ImageRegistryConfigStorage {
    pub fn is_empty(&self) -> bool {
        self.is_unconfigured() && self.management_state.is_empty()
    }
}

impl ImageRegistryConfigRequests {
    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }
}

impl ImageRegistryConfigRequestsLimits {
    pub fn is_empty(&self) -> bool {
        self.max_running == 0 && self.max_in_queue == 0 && self.max_wait_in_queue.is_none()
    }
}

impl ImageRegistryStatus {
    /// Recompute the deprecated `storageManaged` flag from
    /// `storage.managementState`
    pub fn sync_storage_managed(&mut self) {
        self.storage_managed = self.storage.management_state == "Managed";
    }

    /// Storage management state recorded in this status.
    ///
    /// A status written before `storage.managementState` existed only has
    /// the deprecated `storageManaged` flag; that flag is used when the
    /// field is empty. An unparsable value yields `None`.
    pub fn recorded_storage_state(&self) -> Option<StorageManagementState> {
        if self.storage.management_state.is_empty() {
            return Some(StorageManagementState::from_managed_flag(self.storage_managed));
        }
        self.storage.management_state.parse().ok()
    }

    /// Whether `storageManaged` agrees with `storage.managementState`
    pub fn is_consistent(&self) -> bool {
        self.storage_managed == (self.storage.management_state == "Managed")
    }

    /// Set a condition, replacing existing if same type.
    ///
    /// The transition time is carried over when the status did not change.
    pub fn set_condition(&mut self, mut condition: OperatorCondition) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }

    /// Look up a condition by type
    pub fn condition(&self, r#type: &str) -> Option<&OperatorCondition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }
}

impl OperatorCondition {
    pub fn new(r#type: impl Into<String>, status: ConditionStatus, now: DateTime<Utc>) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            last_transition_time: Some(now),
            reason: None,
            message: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_minimal_document() {
        let config: ImageRegistryConfig = serde_json::from_value(serde_json::json!({
            "apiVersion": "imageregistry.operator.openshift.io/v1",
            "kind": "Config",
            "metadata": {"name": "cluster"},
            "spec": {"managementState": "Managed", "replicas": 1, "storage": {"emptyDir": {}}}
        }))
        .unwrap();

        assert!(config.is_singleton());
        assert_eq!(config.spec.management_state, "Managed");
        assert!(config.spec.storage.empty_dir.is_some());
        assert!(config.status.is_none());
    }

    #[test]
    fn test_encode_omits_empty_fields() {
        let spec = ImageRegistrySpec {
            management_state: "Managed".into(),
            replicas: 2,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({"managementState": "Managed", "replicas": 2})
        );
    }

    #[test]
    fn test_status_always_carries_storage_fields() {
        let status = ImageRegistryStatus::default();
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["storageManaged"], serde_json::json!(false));
        assert_eq!(value["storage"], serde_json::json!({}));
    }

    #[test]
    fn test_sync_storage_managed() {
        let mut status = ImageRegistryStatus::default();
        status.storage.management_state = "Managed".into();
        assert!(!status.is_consistent());
        status.sync_storage_managed();
        assert!(status.storage_managed);
        assert!(status.is_consistent());
    }

    #[test]
    fn test_set_condition_keeps_transition_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut status = ImageRegistryStatus::default();
        status.set_condition(OperatorCondition::new("Available", ConditionStatus::True, t0));
        status.set_condition(
            OperatorCondition::new("Available", ConditionStatus::True, t1)
                .with_reason("Ready", "registry is ready"),
        );
        let available = status.condition("Available").unwrap();
        assert_eq!(available.last_transition_time, Some(t0));
        assert_eq!(available.reason.as_deref(), Some("Ready"));

        status.set_condition(OperatorCondition::new("Available", ConditionStatus::False, t1));
        assert_eq!(
            status.condition("Available").unwrap().last_transition_time,
            Some(t1)
        );
        assert_eq!(status.conditions.len(), 1);
    }

    #[test]
    fn test_operator_status_fields_round_trip() {
        let value = serde_json::json!({
            "observedGeneration": 4,
            "readyReplicas": 2,
            "storageManaged": true,
            "storage": {"managementState": "Managed", "pvc": {"claim": "image-registry-storage"}},
            "version": "4.15.0",
            "generations": [{
                "group": "apps",
                "resource": "deployments",
                "namespace": "openshift-image-registry",
                "name": "image-registry",
                "lastGeneration": 7,
                "hash": ""
            }],
            "latestAvailableRevision": 3
        });
        let status: ImageRegistryStatus = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(status.version, "4.15.0");
        assert_eq!(status.generations[0].last_generation, 7);
        assert_eq!(status.latest_available_revision, 3);
        assert_eq!(serde_json::to_value(&status).unwrap(), value);
    }

    #[test]
    fn test_recorded_storage_state() {
        let mut status = ImageRegistryStatus {
            storage_managed: true,
            ..Default::default()
        };
        assert_eq!(
            status.recorded_storage_state(),
            Some(StorageManagementState::Managed)
        );

        status.storage_managed = false;
        assert_eq!(
            status.recorded_storage_state(),
            Some(StorageManagementState::Unmanaged)
        );

        // The explicit field wins over the deprecated flag.
        status.storage_managed = true;
        status.storage.management_state = "Unmanaged".into();
        assert_eq!(
            status.recorded_storage_state(),
            Some(StorageManagementState::Unmanaged)
        );

        status.storage.management_state = "Sometimes".into();
        assert_eq!(status.recorded_storage_state(), None);
    }

    #[test]
    fn test_crd_is_cluster_scoped() {
        use kube::CustomResourceExt;
        let crd = ImageRegistryConfig::crd();
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.names.kind, "Config");
        assert_eq!(crd.spec.names.plural, "configs");
    }
}
