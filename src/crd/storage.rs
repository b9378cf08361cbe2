//! Storage backend wire shapes
//!
//! Mirrors the `spec.storage` / `status.storage` document exactly. Each of
//! the seven backend variants is an optional block; the rule that at most
//! one of them is populated lives in [`crate::domain::backend`], not here.

use crate::domain::duration::GoDuration;
use k8s_openapi::api::core::v1::SecretKeySelector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Storage Union
// =============================================================================

/// How storage should be configured for the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryConfigStorage {
    /// Ephemeral storage on the pod's host node. Cannot be used with more
    /// than one replica and is lost when the pod leaves the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<StorageEmptyDir>,

    /// Amazon S3 or an S3-compatible service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<StorageS3>,

    /// Google Cloud Storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<StorageGcs>,

    /// OpenStack Swift
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift: Option<StorageSwift>,

    /// PersistentVolumeClaim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc: Option<StoragePvc>,

    /// Azure Blob Storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<StorageAzure>,

    /// IBM Cloud Object Storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibmcos: Option<StorageIbmCos>,

    /// Whether the operator manages the underlying storage unit: Managed,
    /// Unmanaged, or empty when not yet decided
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub management_state: String,
}

// =============================================================================
// Backend Variants
// =============================================================================

/// Placeholder selecting ephemeral pod storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StorageEmptyDir {}

/// S3 bucket coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageS3 {
    /// Bucket name, generated when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    /// AWS region, inferred from the installation when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// Endpoint of an S3-compatible service
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_endpoint: String,

    /// Store images encrypted at rest
    #[serde(default, skip_serializing_if = "is_false")]
    pub encrypt: bool,

    /// KMS key ID; ignored unless `encrypt` is set
    #[serde(rename = "keyID", default, skip_serializing_if = "String::is_empty")]
    pub key_id: String,

    /// CloudFront storage middleware
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_front: Option<StorageS3CloudFront>,

    /// Use virtual-hosted bucket paths with a custom endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_hosted_style: Option<bool>,
}

/// CloudFront middleware in front of an S3 bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StorageS3CloudFront {
    /// SCHEME://HOST[/PATH] at which CloudFront is served
    #[serde(rename = "baseURL", default)]
    pub base_url: String,

    /// Secret holding the private key provided by AWS
    #[serde(rename = "privateKey", default)]
    pub private_key: SecretKeySelector,

    /// Key pair ID provided by AWS
    #[serde(rename = "keypairID", default)]
    pub keypair_id: String,

    /// CloudFront session duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub duration: Option<GoDuration>,
}

/// Google Cloud Storage bucket coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageGcs {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(rename = "projectID", default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,

    #[serde(rename = "keyID", default, skip_serializing_if = "String::is_empty")]
    pub key_id: String,
}

/// OpenStack Swift container coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageSwift {
    #[serde(rename = "authURL", default, skip_serializing_if = "String::is_empty")]
    pub auth_url: String,

    /// Keystone auth version; empty lets the registry auto-detect
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    #[serde(rename = "domainID", default, skip_serializing_if = "String::is_empty")]
    pub domain_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tenant: String,

    #[serde(rename = "tenantID", default, skip_serializing_if = "String::is_empty")]
    pub tenant_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_name: String,
}

/// PersistentVolumeClaim reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoragePvc {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub claim: String,
}

/// Azure Blob Storage coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageAzure {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_name: String,

    /// Blob container, 3-63 lowercase alphanumerics separated by single dashes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container: String,

    /// Azure cloud environment, set from the infrastructure when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cloud_name: String,
}

/// IBM Cloud Object Storage coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageIbmCos {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_key_crn: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_instance_crn: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

// =============================================================================
// Implementations
// =============================================================================

impl StorageS3 {
    /// Effective virtual-hosted-style setting
    pub fn virtual_hosted_style(&self) -> bool {
        self.virtual_hosted_style.unwrap_or(false)
    }
}

impl StorageS3CloudFront {
    /// Names of the required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.is_empty() {
            missing.push("baseURL");
        }
        if self.private_key.name.as_deref().unwrap_or_default().is_empty() {
            missing.push("privateKey.name");
        }
        if self.private_key.key.is_empty() {
            missing.push("privateKey.key");
        }
        if self.keypair_id.is_empty() {
            missing.push("keypairID");
        }
        missing
    }

    /// True when none of the required fields carry a value
    pub fn is_blank(&self) -> bool {
        self.missing_fields().len() == 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_variants_stay_absent() {
        let storage: ImageRegistryConfigStorage =
            serde_json::from_str(r#"{"pvc": {"claim": "registry"}}"#).unwrap();
        assert!(storage.empty_dir.is_none());
        assert!(storage.s3.is_none());
        assert_eq!(storage.pvc.as_ref().unwrap().claim, "registry");

        let encoded = serde_json::to_value(&storage).unwrap();
        assert_eq!(encoded, serde_json::json!({"pvc": {"claim": "registry"}}));
    }

    #[test]
    fn test_empty_dir_round_trips_as_present() {
        let storage: ImageRegistryConfigStorage =
            serde_json::from_str(r#"{"emptyDir": {}}"#).unwrap();
        assert_eq!(storage.empty_dir, Some(StorageEmptyDir {}));
        assert_eq!(
            serde_json::to_string(&storage).unwrap(),
            r#"{"emptyDir":{}}"#
        );
    }

    #[test]
    fn test_acronym_field_names() {
        let s3: StorageS3 = serde_json::from_str(
            r#"{"keyID": "k", "regionEndpoint": "https://s3.local", "cloudFront": {
                "baseURL": "https://cdn.local", "keypairID": "kp",
                "privateKey": {"name": "cf", "key": "pem"}, "duration": "20m0s"}}"#,
        )
        .unwrap();
        assert_eq!(s3.key_id, "k");
        assert_eq!(s3.region_endpoint, "https://s3.local");
        let cf = s3.cloud_front.as_ref().unwrap();
        assert!(cf.missing_fields().is_empty());
        assert_eq!(cf.duration.unwrap().as_nanos(), 20 * 60 * 1_000_000_000);

        let swift: StorageSwift =
            serde_json::from_str(r#"{"authURL": "https://keystone", "tenantID": "t1"}"#).unwrap();
        assert_eq!(swift.auth_url, "https://keystone");
        assert_eq!(swift.tenant_id, "t1");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let storage: ImageRegistryConfigStorage =
            serde_json::from_str(r#"{"gcs": {"bucket": "b", "futureField": 1}, "oss": {}}"#)
                .unwrap();
        assert_eq!(storage.gcs.unwrap().bucket, "b");
    }

    #[test]
    fn test_cloudfront_missing_fields() {
        let cf = StorageS3CloudFront {
            base_url: "https://cdn.local".into(),
            ..Default::default()
        };
        assert_eq!(
            cf.missing_fields(),
            vec!["privateKey.name", "privateKey.key", "keypairID"]
        );
        assert!(!cf.is_blank());
        assert!(StorageS3CloudFront::default().is_blank());
    }
}
