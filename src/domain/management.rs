//! Management states and the lifecycle legality matrix
//!
//! Two independent flags govern the registry: the top-level
//! `spec.managementState` (Managed, Unmanaged, Removed) and the storage
//! specific `storage.managementState` (Managed, Unmanaged). Parsing is exact
//! and fails closed: an unrecognised value is an error, never `Managed`.

use crate::crd::image_registry::ImageRegistryStatus;
use crate::domain::backend::StorageBackend;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// Management States
// =============================================================================

/// Whether the reconciler acts on the registry at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagementState {
    Managed,
    Unmanaged,
    Removed,
}

impl ManagementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagementState::Managed => "Managed",
            ManagementState::Unmanaged => "Unmanaged",
            ManagementState::Removed => "Removed",
        }
    }

    /// Parse the value found at `field`, reporting `UnknownManagementState`
    pub fn parse_field(field: &str, value: &str) -> Result<Self, ValidationError> {
        value
            .parse()
            .map_err(|_| ValidationError::UnknownManagementState {
                field: field.to_string(),
                value: value.to_string(),
            })
    }
}

impl FromStr for ManagementState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Managed" => Ok(ManagementState::Managed),
            "Unmanaged" => Ok(ManagementState::Unmanaged),
            "Removed" => Ok(ManagementState::Removed),
            _ => Err(UnknownState),
        }
    }
}

impl std::fmt::Display for ManagementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the reconciler owns the storage unit behind the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageManagementState {
    Managed,
    Unmanaged,
}

impl StorageManagementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageManagementState::Managed => "Managed",
            StorageManagementState::Unmanaged => "Unmanaged",
        }
    }

    /// Parse an optional wire value: empty means "not decided yet"
    pub fn parse_field(field: &str, value: &str) -> Result<Option<Self>, ValidationError> {
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::UnknownManagementState {
                field: field.to_string(),
                value: value.to_string(),
            })
    }

    /// Value of the deprecated `storageManaged` boolean
    pub fn is_managed(&self) -> bool {
        matches!(self, StorageManagementState::Managed)
    }

    pub fn from_managed_flag(managed: bool) -> Self {
        if managed {
            StorageManagementState::Managed
        } else {
            StorageManagementState::Unmanaged
        }
    }
}

impl FromStr for StorageManagementState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Managed" => Ok(StorageManagementState::Managed),
            "Unmanaged" => Ok(StorageManagementState::Unmanaged),
            _ => Err(UnknownState),
        }
    }
}

impl std::fmt::Display for StorageManagementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse failure for a management state string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownState;

impl std::fmt::Display for UnknownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown management state")
    }
}

impl std::error::Error for UnknownState {}

// =============================================================================
// Legality Matrix
// =============================================================================

/// Operation the reconciler may want to perform on the storage unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOperation {
    Create,
    Mutate,
    Delete,
}

/// Whether `op` on the storage unit is allowed.
///
/// For `Removed`, `storage` must be the snapshot taken when Removed was
/// first observed. An undecided storage state (`None`) permits creation
/// under Managed but never deletion.
pub fn is_permitted(
    state: ManagementState,
    storage: Option<StorageManagementState>,
    op: StorageOperation,
) -> bool {
    match (state, op) {
        (ManagementState::Unmanaged, _) => false,
        (ManagementState::Managed, StorageOperation::Delete) => false,
        (ManagementState::Managed, _) => storage != Some(StorageManagementState::Unmanaged),
        (ManagementState::Removed, StorageOperation::Delete) => {
            storage == Some(StorageManagementState::Managed)
        }
        (ManagementState::Removed, _) => false,
    }
}

/// What the reconciler should do this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Converge the registry; storage may be provisioned and updated
    Reconcile { manage_storage: bool },
    /// Leave everything as it is
    Suspend,
    /// Tear the registry down, deleting storage only if it was ours
    Teardown { delete_storage: bool },
}

/// Decide the lifecycle action for one reconciliation cycle.
///
/// The Removed deletion decision reads the storage state recorded in the
/// prior status, which the status projector freezes once Removed is seen.
/// A prior status that predates `storage.managementState` contributes its
/// `storageManaged` flag instead. Without a prior status the spec's storage
/// state is the snapshot.
pub fn plan_lifecycle(
    state: ManagementState,
    storage: Option<StorageManagementState>,
    backend: Option<&StorageBackend>,
    prior: Option<&ImageRegistryStatus>,
) -> LifecycleAction {
    match state {
        ManagementState::Unmanaged => LifecycleAction::Suspend,
        ManagementState::Managed => LifecycleAction::Reconcile {
            manage_storage: backend.is_some()
                && is_permitted(state, storage, StorageOperation::Mutate),
        },
        ManagementState::Removed => {
            // An unparsable recorded state must not authorise deletion.
            let snapshot = match prior {
                Some(status) => status.recorded_storage_state(),
                None => storage,
            };
            LifecycleAction::Teardown {
                delete_storage: is_permitted(state, snapshot, StorageOperation::Delete),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::storage::{ImageRegistryConfigStorage, StorageEmptyDir};
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!("Managed".parse::<ManagementState>(), Ok(ManagementState::Managed));
        assert_eq!("Removed".parse::<ManagementState>(), Ok(ManagementState::Removed));
        assert!("managed".parse::<ManagementState>().is_err());
        assert!("".parse::<ManagementState>().is_err());
        assert!("Removed".parse::<StorageManagementState>().is_err());
    }

    #[test]
    fn test_unknown_value_fails_closed() {
        assert_matches!(
            ManagementState::parse_field("spec.managementState", "Force"),
            Err(ValidationError::UnknownManagementState { ref value, .. }) if value == "Force"
        );
        assert_eq!(
            StorageManagementState::parse_field("spec.storage.managementState", ""),
            Ok(None)
        );
        assert!(
            StorageManagementState::parse_field("spec.storage.managementState", "Yes").is_err()
        );
    }

    #[test]
    fn test_legality_matrix() {
        use ManagementState::*;
        use StorageOperation::*;
        let managed = Some(StorageManagementState::Managed);
        let unmanaged = Some(StorageManagementState::Unmanaged);

        for op in [Create, Mutate, Delete] {
            assert!(!is_permitted(Unmanaged, managed, op));
        }

        assert!(is_permitted(Managed, managed, Create));
        assert!(is_permitted(Managed, None, Create));
        assert!(!is_permitted(Managed, unmanaged, Mutate));
        assert!(!is_permitted(Managed, managed, Delete));

        assert!(!is_permitted(Removed, managed, Create));
        assert!(is_permitted(Removed, managed, Delete));
        assert!(!is_permitted(Removed, unmanaged, Delete));
        assert!(!is_permitted(Removed, None, Delete));
    }

    #[test]
    fn test_plan_managed_and_unmanaged() {
        let backend = StorageBackend::EmptyDir(StorageEmptyDir {});
        assert_eq!(
            plan_lifecycle(ManagementState::Managed, None, Some(&backend), None),
            LifecycleAction::Reconcile { manage_storage: true }
        );
        assert_eq!(
            plan_lifecycle(
                ManagementState::Managed,
                Some(StorageManagementState::Unmanaged),
                Some(&backend),
                None
            ),
            LifecycleAction::Reconcile { manage_storage: false }
        );
        assert_eq!(
            plan_lifecycle(ManagementState::Unmanaged, None, Some(&backend), None),
            LifecycleAction::Suspend
        );
    }

    #[test]
    fn test_removed_uses_status_snapshot() {
        let prior = ImageRegistryStatus {
            storage_managed: true,
            storage: ImageRegistryConfigStorage {
                empty_dir: Some(StorageEmptyDir {}),
                management_state: "Managed".into(),
                ..Default::default()
            },
            ..Default::default()
        };

        // The spec was flipped to Unmanaged after removal started; the
        // snapshot still governs.
        assert_eq!(
            plan_lifecycle(
                ManagementState::Removed,
                Some(StorageManagementState::Unmanaged),
                None,
                Some(&prior)
            ),
            LifecycleAction::Teardown { delete_storage: true }
        );

        assert_eq!(
            plan_lifecycle(
                ManagementState::Removed,
                Some(StorageManagementState::Managed),
                None,
                None
            ),
            LifecycleAction::Teardown { delete_storage: true }
        );

        let garbled = ImageRegistryStatus {
            storage: ImageRegistryConfigStorage {
                management_state: "Whatever".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            plan_lifecycle(
                ManagementState::Removed,
                Some(StorageManagementState::Managed),
                None,
                Some(&garbled)
            ),
            LifecycleAction::Teardown { delete_storage: false }
        );
    }

    #[test]
    fn test_removed_reads_legacy_storage_managed_flag() {
        let legacy = ImageRegistryStatus {
            storage_managed: true,
            storage: ImageRegistryConfigStorage {
                empty_dir: Some(StorageEmptyDir {}),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            plan_lifecycle(
                ManagementState::Removed,
                Some(StorageManagementState::Managed),
                None,
                Some(&legacy)
            ),
            LifecycleAction::Teardown { delete_storage: true }
        );

        let not_ours = ImageRegistryStatus {
            storage_managed: false,
            ..legacy
        };
        assert_eq!(
            plan_lifecycle(ManagementState::Removed, None, None, Some(&not_ours)),
            LifecycleAction::Teardown { delete_storage: false }
        );
    }
}
