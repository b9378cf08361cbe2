//! Request Admission Configuration
//!
//! Read and write request limits handed to the registry's admission layer.
//! Negative input is invalid but never fatal: it is clamped to zero and
//! flagged with an `InvalidAdmissionLimit` advisory. Zero means no limit.

use crate::crd::image_registry::{ImageRegistryConfigRequests, ImageRegistryConfigRequestsLimits};
use crate::domain::advisory::{Advisory, AdvisoryKind, Normalized};
use crate::domain::duration::GoDuration;

/// Limits for one request class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestLimits {
    /// Maximum in-flight requests, 0 for unlimited
    pub max_running: u64,
    /// Maximum queued requests, 0 for unlimited
    pub max_in_queue: u64,
    /// Maximum queue wait; never negative
    pub max_wait_in_queue: Option<GoDuration>,
}

impl RequestLimits {
    pub fn is_unlimited(&self) -> bool {
        self.max_running == 0
            && self.max_in_queue == 0
            && self.max_wait_in_queue.map_or(true, |d| d.is_zero())
    }

    /// Queue wait as a standard duration, `None` when unset
    pub fn max_wait(&self) -> Option<std::time::Duration> {
        self.max_wait_in_queue.and_then(|d| d.to_std())
    }

    pub fn to_wire(&self) -> ImageRegistryConfigRequestsLimits {
        ImageRegistryConfigRequestsLimits {
            max_running: i64::try_from(self.max_running).unwrap_or(i64::MAX),
            max_in_queue: i64::try_from(self.max_in_queue).unwrap_or(i64::MAX),
            max_wait_in_queue: self.max_wait_in_queue,
        }
    }
}

/// Read and write limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub read: RequestLimits,
    pub write: RequestLimits,
}

impl AdmissionLimits {
    pub fn to_wire(&self) -> ImageRegistryConfigRequests {
        ImageRegistryConfigRequests {
            read: self.read.to_wire(),
            write: self.write.to_wire(),
        }
    }
}

/// Validate both limit triples, clamping negative values
pub fn normalize_requests(requests: &ImageRegistryConfigRequests) -> Normalized<AdmissionLimits> {
    let mut advisories = Vec::new();
    let read = normalize_limits("spec.requests.read", &requests.read, &mut advisories);
    let write = normalize_limits("spec.requests.write", &requests.write, &mut advisories);
    Normalized::with_advisories(AdmissionLimits { read, write }, advisories)
}

fn normalize_limits(
    prefix: &str,
    limits: &ImageRegistryConfigRequestsLimits,
    advisories: &mut Vec<Advisory>,
) -> RequestLimits {
    RequestLimits {
        max_running: clamp_count(prefix, "maxRunning", limits.max_running, advisories),
        max_in_queue: clamp_count(prefix, "maxInQueue", limits.max_in_queue, advisories),
        max_wait_in_queue: limits.max_wait_in_queue.map(|wait| {
            if wait.is_negative() {
                advisories.push(clamped(prefix, "maxWaitInQueue", wait));
                GoDuration::ZERO
            } else {
                wait
            }
        }),
    }
}

fn clamp_count(prefix: &str, field: &str, value: i64, advisories: &mut Vec<Advisory>) -> u64 {
    u64::try_from(value).unwrap_or_else(|_| {
        advisories.push(clamped(prefix, field, value));
        0
    })
}

fn clamped(prefix: &str, field: &str, value: impl std::fmt::Display) -> Advisory {
    Advisory::new(
        AdvisoryKind::InvalidAdmissionLimit,
        format!("{}.{}", prefix, field),
        format!("negative value {} clamped to 0", value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_max_running_is_clamped() {
        let requests = ImageRegistryConfigRequests {
            read: ImageRegistryConfigRequestsLimits {
                max_running: -5,
                ..Default::default()
            },
            ..Default::default()
        };
        let normalized = normalize_requests(&requests);
        assert_eq!(normalized.value.read.max_running, 0);
        assert_eq!(normalized.advisories.len(), 1);
        assert_eq!(
            normalized.advisories[0].field,
            "spec.requests.read.maxRunning"
        );
        assert_eq!(normalized.count(AdvisoryKind::InvalidAdmissionLimit), 1);
    }

    #[test]
    fn test_negative_wait_is_clamped_to_zero() {
        let requests = ImageRegistryConfigRequests {
            write: ImageRegistryConfigRequestsLimits {
                max_wait_in_queue: Some(GoDuration::from_secs(-5)),
                ..Default::default()
            },
            ..Default::default()
        };
        let normalized = normalize_requests(&requests);
        assert_eq!(
            normalized.value.write.max_wait_in_queue,
            Some(GoDuration::ZERO)
        );
        assert_eq!(normalized.count(AdvisoryKind::InvalidAdmissionLimit), 1);
        assert!(normalized.value.write.is_unlimited());
    }

    #[test]
    fn test_valid_limits_pass_through() {
        let requests = ImageRegistryConfigRequests {
            read: ImageRegistryConfigRequestsLimits {
                max_running: 100,
                max_in_queue: 1000,
                max_wait_in_queue: Some(GoDuration::from_secs(60)),
            },
            ..Default::default()
        };
        let normalized = normalize_requests(&requests);
        assert!(normalized.advisories.is_empty());
        assert_eq!(
            normalized.value.read.max_wait(),
            Some(std::time::Duration::from_secs(60))
        );
        assert!(normalized.value.write.is_unlimited());
        assert_eq!(normalized.value.to_wire(), requests);
    }
}
