//! Storage Configuration Normalizer
//!
//! Turns a raw storage document into a [`CanonicalStorage`]: selects the
//! single active backend, applies per-variant defaults and migrates the
//! deprecated `status.storageManaged` flag into `storage.managementState`.
//! The deprecated `logging` level migration lives here as well so that the
//! rest of the crate only ever sees canonical fields.

use crate::crd::storage::{ImageRegistryConfigStorage, StorageAzure, StorageS3};
use crate::domain::advisory::{Advisory, AdvisoryKind, Normalized};
use crate::domain::backend::{BackendKind, StorageBackend};
use crate::domain::management::StorageManagementState;
use crate::error::{ValidationError, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Azure blob container name length bounds
const AZURE_CONTAINER_MIN_LEN: usize = 3;
const AZURE_CONTAINER_MAX_LEN: usize = 63;

// =============================================================================
// Canonical Storage
// =============================================================================

/// Storage configuration with at most one backend and resolved management state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalStorage {
    /// Selected backend; `None` leaves backend inference to the reconciler
    pub backend: Option<StorageBackend>,
    /// `None` means the reconciler has not yet decided who owns the storage
    pub management_state: Option<StorageManagementState>,
}

impl CanonicalStorage {
    pub fn kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(StorageBackend::kind)
    }

    pub fn is_unset(&self) -> bool {
        self.backend.is_none()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.kind().is_some_and(|k| k.is_ephemeral())
    }

    /// Wire form of this storage configuration
    pub fn to_storage(&self) -> ImageRegistryConfigStorage {
        let management_state = self
            .management_state
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        match &self.backend {
            Some(backend) => backend.clone().into_storage(management_state),
            None => ImageRegistryConfigStorage {
                management_state,
                ..Default::default()
            },
        }
    }
}

// =============================================================================
// Storage Normalization
// =============================================================================

/// Normalize a storage document.
///
/// `legacy_storage_managed` is the deprecated `status.storageManaged` flag of
/// a status object that predates `storage.managementState`; pass `None` when
/// there is nothing to migrate. All structural problems are collected.
pub fn normalize_storage(
    storage: &ImageRegistryConfigStorage,
    legacy_storage_managed: Option<bool>,
) -> Result<Normalized<CanonicalStorage>, ValidationErrors> {
    let mut errors = Vec::new();
    let mut advisories = Vec::new();

    let explicit = StorageManagementState::parse_field(
        "spec.storage.managementState",
        &storage.management_state,
    )
    .unwrap_or_else(|e| {
        errors.push(e);
        None
    });

    let management_state = match (explicit, legacy_storage_managed) {
        (Some(state), Some(flag)) if state.is_managed() != flag => {
            advisories.push(Advisory::new(
                AdvisoryKind::DeprecatedFieldConflict,
                "status.storageManaged",
                format!(
                    "storageManaged={} disagrees with storage.managementState={}; using {}",
                    flag, state, state
                ),
            ));
            Some(state)
        }
        (Some(state), _) => Some(state),
        (None, Some(true)) => Some(StorageManagementState::Managed),
        (None, _) => None,
    };

    let backend = match storage.backend() {
        Ok(Some(backend)) => Some(normalize_backend(backend, &mut advisories, &mut errors)),
        Ok(None) => None,
        Err(e) => {
            errors.push(e);
            None
        }
    };

    if let Some(errors) = ValidationErrors::from_vec(errors) {
        return Err(errors);
    }

    Ok(Normalized::with_advisories(
        CanonicalStorage {
            backend,
            management_state,
        },
        advisories,
    ))
}

fn normalize_backend(
    backend: StorageBackend,
    advisories: &mut Vec<Advisory>,
    errors: &mut Vec<ValidationError>,
) -> StorageBackend {
    match backend {
        StorageBackend::S3(s3) => StorageBackend::S3(normalize_s3(s3, advisories, errors)),
        StorageBackend::Azure(azure) => {
            if let Err(e) = check_azure(&azure) {
                errors.push(e);
            }
            StorageBackend::Azure(azure)
        }
        // An empty Swift authVersion is left as is; the registry auto-detects it.
        other => other,
    }
}

fn normalize_s3(
    mut s3: StorageS3,
    advisories: &mut Vec<Advisory>,
    errors: &mut Vec<ValidationError>,
) -> StorageS3 {
    if s3.virtual_hosted_style.is_none() {
        s3.virtual_hosted_style = Some(false);
        advisories.push(Advisory::new(
            AdvisoryKind::DefaultApplied,
            "spec.storage.s3.virtualHostedStyle",
            "not set, defaulting to false",
        ));
    }

    if !s3.encrypt && !s3.key_id.is_empty() {
        s3.key_id.clear();
        advisories.push(Advisory::new(
            AdvisoryKind::IgnoredField,
            "spec.storage.s3.keyID",
            "encrypt is false; KMS key ID dropped",
        ));
    }

    let cloud_front = s3
        .cloud_front
        .as_ref()
        .map(|cf| (cf.is_blank(), cf.missing_fields()));
    match cloud_front {
        Some((true, _)) => {
            s3.cloud_front = None;
            advisories.push(Advisory::new(
                AdvisoryKind::IgnoredField,
                "spec.storage.s3.cloudFront",
                "baseURL, privateKey and keypairID are all empty; CloudFront disabled",
            ));
        }
        Some((false, missing)) if !missing.is_empty() => {
            errors.push(ValidationError::IncompleteCloudFront { missing });
        }
        _ => {}
    }

    s3
}

fn check_azure(azure: &StorageAzure) -> Result<(), ValidationError> {
    let container = &azure.container;
    if container.is_empty() {
        return Ok(());
    }

    let invalid = |reason: &str| ValidationError::InvalidAzureContainer {
        container: container.clone(),
        reason: reason.to_string(),
    };

    if container.len() < AZURE_CONTAINER_MIN_LEN || container.len() > AZURE_CONTAINER_MAX_LEN {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !container
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-')
    {
        return Err(invalid("may only contain lowercase letters, digits and dashes"));
    }
    if container.starts_with('-') || container.ends_with('-') || container.contains("--") {
        return Err(invalid("dashes must separate alphanumeric runs"));
    }
    Ok(())
}

// =============================================================================
// Log Level Migration
// =============================================================================

/// Verbosity of the registry and operator logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Normal,
    Debug,
    Trace,
    TraceAll,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Normal => "Normal",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
            LogLevel::TraceAll => "TraceAll",
        }
    }

    /// Level equivalent to a deprecated numeric `logging` value
    pub fn from_logging(logging: i64) -> Self {
        match logging {
            i64::MIN..=1 => LogLevel::Normal,
            2..=3 => LogLevel::Debug,
            4..=5 => LogLevel::Trace,
            _ => LogLevel::TraceAll,
        }
    }

    /// Parse an optional wire value, reporting `UnknownLogLevel`
    pub fn parse_field(field: &str, value: &str) -> Result<Option<Self>, ValidationError> {
        if value.is_empty() {
            return Ok(None);
        }
        Self::from_str(value)
            .map(Some)
            .map_err(|_| ValidationError::UnknownLogLevel {
                field: field.to_string(),
                value: value.to_string(),
            })
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(LogLevel::Normal),
            "Debug" => Ok(LogLevel::Debug),
            "Trace" => Ok(LogLevel::Trace),
            "TraceAll" => Ok(LogLevel::TraceAll),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve `logLevel` against the deprecated `logging` field.
///
/// An explicit `logLevel` always wins. Otherwise a non-zero `logging` is
/// migrated into `logLevel`. The deprecated value itself is never touched.
pub fn normalize_log_level(
    log_level: &str,
    logging: i64,
) -> Result<Normalized<Option<LogLevel>>, ValidationError> {
    let explicit = LogLevel::parse_field("spec.logLevel", log_level)?;
    if explicit.is_some() || logging == 0 {
        return Ok(Normalized::new(explicit));
    }

    let migrated = LogLevel::from_logging(logging);
    Ok(Normalized::with_advisories(
        Some(migrated),
        vec![Advisory::new(
            AdvisoryKind::DeprecatedFieldUsed,
            "spec.logging",
            format!("logging={} is deprecated, migrated to logLevel={}", logging, migrated),
        )],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::storage::{StorageEmptyDir, StorageGcs, StorageS3CloudFront};
    use assert_matches::assert_matches;

    fn managed_state(state: &str) -> ImageRegistryConfigStorage {
        ImageRegistryConfigStorage {
            management_state: state.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_backends_is_unset() {
        let normalized = normalize_storage(&ImageRegistryConfigStorage::default(), None).unwrap();
        assert!(normalized.value.is_unset());
        assert!(normalized.value.management_state.is_none());
        assert!(normalized.advisories.is_empty());
    }

    #[test]
    fn test_multiple_backends_rejected() {
        let storage = ImageRegistryConfigStorage {
            gcs: Some(StorageGcs::default()),
            empty_dir: Some(StorageEmptyDir {}),
            ..Default::default()
        };
        let errors = normalize_storage(&storage, None).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::MultipleBackendsConfigured {
                backends: vec![BackendKind::EmptyDir, BackendKind::Gcs],
            }]
        );
    }

    #[test]
    fn test_legacy_flag_migrates_without_advisory() {
        let normalized = normalize_storage(&managed_state(""), Some(true)).unwrap();
        assert_eq!(
            normalized.value.management_state,
            Some(StorageManagementState::Managed)
        );
        assert!(normalized.advisories.is_empty());
    }

    #[test]
    fn test_explicit_state_beats_legacy_flag() {
        let normalized = normalize_storage(&managed_state("Unmanaged"), Some(true)).unwrap();
        assert_eq!(
            normalized.value.management_state,
            Some(StorageManagementState::Unmanaged)
        );
        assert_eq!(normalized.advisories.len(), 1);
        assert_eq!(normalized.count(AdvisoryKind::DeprecatedFieldConflict), 1);
    }

    #[test]
    fn test_agreeing_legacy_flag_is_silent() {
        let normalized = normalize_storage(&managed_state("Managed"), Some(true)).unwrap();
        assert!(normalized.advisories.is_empty());

        let normalized = normalize_storage(&managed_state(""), Some(false)).unwrap();
        assert!(normalized.value.management_state.is_none());
        assert!(normalized.advisories.is_empty());
    }

    #[test]
    fn test_unknown_storage_state() {
        let errors = normalize_storage(&managed_state("Removed"), None).unwrap_err();
        assert_matches!(
            errors.errors(),
            [ValidationError::UnknownManagementState { value, .. }] if value == "Removed"
        );
    }

    #[test]
    fn test_errors_are_collected_together() {
        let storage = ImageRegistryConfigStorage {
            s3: Some(StorageS3::default()),
            pvc: Some(Default::default()),
            management_state: "Sometimes".into(),
            ..Default::default()
        };
        let errors = normalize_storage(&storage, None).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_s3_defaults_virtual_hosted_style() {
        let storage = ImageRegistryConfigStorage {
            s3: Some(StorageS3::default()),
            ..Default::default()
        };
        let normalized = normalize_storage(&storage, None).unwrap();
        assert_eq!(normalized.count(AdvisoryKind::DefaultApplied), 1);
        assert_matches!(
            normalized.value.backend,
            Some(StorageBackend::S3(ref s3)) if s3.virtual_hosted_style == Some(false)
        );

        // Second pass over the canonical form is silent.
        let again = normalize_storage(&normalized.value.to_storage(), None).unwrap();
        assert!(again.advisories.is_empty());
        assert_eq!(again.value, normalized.value);
    }

    #[test]
    fn test_s3_key_id_requires_encrypt() {
        let storage = ImageRegistryConfigStorage {
            s3: Some(StorageS3 {
                bucket: "b".into(),
                key_id: "kms-key".into(),
                virtual_hosted_style: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let normalized = normalize_storage(&storage, None).unwrap();
        assert_eq!(normalized.advisories.len(), 1);
        assert_eq!(normalized.count(AdvisoryKind::IgnoredField), 1);
        assert_eq!(normalized.advisories[0].field, "spec.storage.s3.keyID");
        assert_matches!(
            normalized.value.backend,
            Some(StorageBackend::S3(ref s3)) if s3.key_id.is_empty()
        );

        let again = normalize_storage(&normalized.value.to_storage(), None).unwrap();
        assert!(again.advisories.is_empty());
        assert_eq!(again.value, normalized.value);

        let mut encrypted = storage;
        if let Some(s3) = encrypted.s3.as_mut() {
            s3.encrypt = true;
        }
        let normalized = normalize_storage(&encrypted, None).unwrap();
        assert!(normalized.advisories.is_empty());
        assert_matches!(
            normalized.value.backend,
            Some(StorageBackend::S3(ref s3)) if s3.key_id == "kms-key"
        );
    }

    #[test]
    fn test_cloudfront_all_or_nothing() {
        let partial = ImageRegistryConfigStorage {
            s3: Some(StorageS3 {
                virtual_hosted_style: Some(false),
                cloud_front: Some(StorageS3CloudFront {
                    base_url: "https://cdn.example.com".into(),
                    keypair_id: "APKA".into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let errors = normalize_storage(&partial, None).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[ValidationError::IncompleteCloudFront {
                missing: vec!["privateKey.name", "privateKey.key"],
            }]
        );

        let blank = ImageRegistryConfigStorage {
            s3: Some(StorageS3 {
                virtual_hosted_style: Some(true),
                cloud_front: Some(StorageS3CloudFront::default()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let normalized = normalize_storage(&blank, None).unwrap();
        assert_eq!(normalized.count(AdvisoryKind::IgnoredField), 1);
        assert_matches!(
            normalized.value.backend,
            Some(StorageBackend::S3(ref s3)) if s3.cloud_front.is_none()
        );
    }

    #[test]
    fn test_azure_container_rules() {
        let azure = |container: &str| StorageAzure {
            container: container.into(),
            ..Default::default()
        };
        assert!(check_azure(&azure("")).is_ok());
        assert!(check_azure(&azure("registry-data-01")).is_ok());
        assert!(check_azure(&azure("ab")).is_err());
        assert!(check_azure(&azure(&"a".repeat(64))).is_err());
        assert!(check_azure(&azure("Registry")).is_err());
        assert!(check_azure(&azure("-registry")).is_err());
        assert!(check_azure(&azure("reg--istry")).is_err());
    }

    #[test]
    fn test_log_level_migration() {
        let normalized = normalize_log_level("", 2).unwrap();
        assert_eq!(normalized.value, Some(LogLevel::Debug));
        assert_eq!(normalized.count(AdvisoryKind::DeprecatedFieldUsed), 1);

        let normalized = normalize_log_level("Trace", 2).unwrap();
        assert_eq!(normalized.value, Some(LogLevel::Trace));
        assert!(normalized.advisories.is_empty());

        let normalized = normalize_log_level("", 0).unwrap();
        assert_eq!(normalized.value, None);

        assert_matches!(
            normalize_log_level("Verbose", 0),
            Err(ValidationError::UnknownLogLevel { .. })
        );
    }

    #[test]
    fn test_logging_mapping() {
        assert_eq!(LogLevel::from_logging(-3), LogLevel::Normal);
        assert_eq!(LogLevel::from_logging(1), LogLevel::Normal);
        assert_eq!(LogLevel::from_logging(3), LogLevel::Debug);
        assert_eq!(LogLevel::from_logging(5), LogLevel::Trace);
        assert_eq!(LogLevel::from_logging(9), LogLevel::TraceAll);
    }
}
