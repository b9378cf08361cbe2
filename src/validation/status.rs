//! Status Projector
//!
//! Builds the status written back after a reconciliation cycle from the
//! canonical config, the prior status and what the reconciler achieved.
//! `storageManaged` is always derived from `storage.managementState`.

use crate::crd::image_registry::{ImageRegistryStatus, OperatorCondition};
use crate::domain::management::ManagementState;
use crate::validation::normalizer::CanonicalStorage;
use crate::validation::validator::CanonicalConfig;
use tracing::debug;

/// What the reconciler achieved during one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Storage actually applied this cycle; `None` keeps the prior value
    pub applied_storage: Option<CanonicalStorage>,
    pub ready_replicas: i32,
    /// Conditions to merge into the status by type
    pub conditions: Vec<OperatorCondition>,
}

/// Project the new status.
///
/// - Managed: storage follows what the reconciler applied.
/// - Unmanaged: the prior status is kept; nothing was acted upon.
/// - Removed: storage is frozen at the prior value, the snapshot the
///   teardown deletion decision is based on. A legacy snapshot gets its
///   `managementState` filled from `storageManaged`.
pub fn project_status(
    config: &CanonicalConfig,
    generation: Option<i64>,
    prior: Option<&ImageRegistryStatus>,
    outcome: ReconcileOutcome,
) -> ImageRegistryStatus {
    let mut status = prior.cloned().unwrap_or_default();

    match config.management_state {
        ManagementState::Unmanaged => {
            status.sync_storage_managed();
            return status;
        }
        ManagementState::Managed => {
            if let Some(applied) = &outcome.applied_storage {
                status.storage = applied.to_storage();
            }
        }
        ManagementState::Removed => match prior {
            // Pin a legacy snapshot to the state its deprecated flag recorded,
            // since `storageManaged` is re-synced below.
            Some(prior) if prior.storage.management_state.is_empty() => {
                if let Some(state) = prior.recorded_storage_state() {
                    status.storage.management_state = state.as_str().to_string();
                }
            }
            Some(_) => {}
            None => {
                if let Some(applied) = &outcome.applied_storage {
                    status.storage = applied.to_storage();
                }
            }
        },
    }

    status.observed_generation = generation.or(status.observed_generation);
    status.ready_replicas = outcome.ready_replicas;
    for condition in outcome.conditions {
        status.set_condition(condition);
    }
    status.sync_storage_managed();

    debug!(
        management_state = %config.management_state,
        storage_managed = status.storage_managed,
        "Status projected"
    );
    status
}
