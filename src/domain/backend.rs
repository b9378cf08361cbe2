//! Storage backend tagged union
//!
//! The wire form carries seven independent optional blocks. Everything past
//! the boundary works with [`StorageBackend`] instead, and
//! [`ImageRegistryConfigStorage::backend`] is the one place that decides
//! whether a wire value selects zero, one, or too many backends.

use crate::crd::storage::{
    ImageRegistryConfigStorage, StorageAzure, StorageEmptyDir, StorageGcs, StorageIbmCos,
    StoragePvc, StorageS3, StorageSwift,
};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

// =============================================================================
// Backend Kind
// =============================================================================

/// Name of a storage backend variant.
///
/// Variants are declared in alphabetical order of their wire names so the
/// derived `Ord` gives deterministic error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "azure")]
    Azure,
    #[serde(rename = "emptyDir")]
    EmptyDir,
    #[serde(rename = "gcs")]
    Gcs,
    #[serde(rename = "ibmcos")]
    IbmCos,
    #[serde(rename = "pvc")]
    Pvc,
    #[serde(rename = "s3")]
    S3,
    #[serde(rename = "swift")]
    Swift,
}

impl BackendKind {
    pub const ALL: [BackendKind; 7] = [
        BackendKind::Azure,
        BackendKind::EmptyDir,
        BackendKind::Gcs,
        BackendKind::IbmCos,
        BackendKind::Pvc,
        BackendKind::S3,
        BackendKind::Swift,
    ];

    /// Field name of this variant in the storage document
    pub fn field_name(&self) -> &'static str {
        match self {
            BackendKind::Azure => "azure",
            BackendKind::EmptyDir => "emptyDir",
            BackendKind::Gcs => "gcs",
            BackendKind::IbmCos => "ibmcos",
            BackendKind::Pvc => "pvc",
            BackendKind::S3 => "s3",
            BackendKind::Swift => "swift",
        }
    }

    /// Whether data stored by this backend is lost with the pod
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, BackendKind::EmptyDir)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

// =============================================================================
// Storage Backend
// =============================================================================

/// Exactly one selected storage backend with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    EmptyDir(StorageEmptyDir),
    S3(StorageS3),
    Gcs(StorageGcs),
    Swift(StorageSwift),
    Pvc(StoragePvc),
    Azure(StorageAzure),
    IbmCos(StorageIbmCos),
}

impl StorageBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            StorageBackend::EmptyDir(_) => BackendKind::EmptyDir,
            StorageBackend::S3(_) => BackendKind::S3,
            StorageBackend::Gcs(_) => BackendKind::Gcs,
            StorageBackend::Swift(_) => BackendKind::Swift,
            StorageBackend::Pvc(_) => BackendKind::Pvc,
            StorageBackend::Azure(_) => BackendKind::Azure,
            StorageBackend::IbmCos(_) => BackendKind::IbmCos,
        }
    }

    /// Build the wire form carrying only this backend
    pub fn into_storage(self, management_state: String) -> ImageRegistryConfigStorage {
        let mut storage = ImageRegistryConfigStorage {
            management_state,
            ..Default::default()
        };
        match self {
            StorageBackend::EmptyDir(v) => storage.empty_dir = Some(v),
            StorageBackend::S3(v) => storage.s3 = Some(v),
            StorageBackend::Gcs(v) => storage.gcs = Some(v),
            StorageBackend::Swift(v) => storage.swift = Some(v),
            StorageBackend::Pvc(v) => storage.pvc = Some(v),
            StorageBackend::Azure(v) => storage.azure = Some(v),
            StorageBackend::IbmCos(v) => storage.ibmcos = Some(v),
        }
        storage
    }
}

impl ImageRegistryConfigStorage {
    /// Kinds of all populated variants, in alphabetical order
    pub fn configured_kinds(&self) -> Vec<BackendKind> {
        let populated = [
            (BackendKind::Azure, self.azure.is_some()),
            (BackendKind::EmptyDir, self.empty_dir.is_some()),
            (BackendKind::Gcs, self.gcs.is_some()),
            (BackendKind::IbmCos, self.ibmcos.is_some()),
            (BackendKind::Pvc, self.pvc.is_some()),
            (BackendKind::S3, self.s3.is_some()),
            (BackendKind::Swift, self.swift.is_some()),
        ];
        populated
            .into_iter()
            .filter_map(|(kind, set)| set.then_some(kind))
            .collect()
    }

    /// Select the configured backend.
    ///
    /// Returns `Ok(None)` when no variant is populated and
    /// `MultipleBackendsConfigured` when more than one is.
    pub fn backend(&self) -> Result<Option<StorageBackend>, ValidationError> {
        let kinds = self.configured_kinds();
        if kinds.len() > 1 {
            return Err(ValidationError::MultipleBackendsConfigured { backends: kinds });
        }

        let backend = if let Some(v) = &self.empty_dir {
            Some(StorageBackend::EmptyDir(v.clone()))
        } else if let Some(v) = &self.s3 {
            Some(StorageBackend::S3(v.clone()))
        } else if let Some(v) = &self.gcs {
            Some(StorageBackend::Gcs(v.clone()))
        } else if let Some(v) = &self.swift {
            Some(StorageBackend::Swift(v.clone()))
        } else if let Some(v) = &self.pvc {
            Some(StorageBackend::Pvc(v.clone()))
        } else if let Some(v) = &self.azure {
            Some(StorageBackend::Azure(v.clone()))
        } else {
            self.ibmcos.clone().map(StorageBackend::IbmCos)
        };
        Ok(backend)
    }

    /// Whether no backend variant is populated
    pub fn is_unconfigured(&self) -> bool {
        self.configured_kinds().is_empty()
    }
}
