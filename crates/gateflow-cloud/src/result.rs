//! Deployment result types

use crate::resource::{ResourceState, ResourceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall outcome of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Every resource is ready
    Success,
    /// Some resources are ready, others failed or were never attempted
    PartialFailure,
    /// Nothing reached ready
    Failure,
}

impl DeploymentStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentStatus::Success)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::Success => write!(f, "success"),
            DeploymentStatus::PartialFailure => write!(f, "partial failure"),
            DeploymentStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Result of applying a resource graph
///
/// Owned entirely by the caller once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub status: DeploymentStatus,

    /// Final state per resource id
    pub resource_states: BTreeMap<String, ResourceState>,

    /// Externally reachable address, present only when the terminal
    /// resource is ready
    pub endpoint: Option<String>,

    /// Whether the run was interrupted
    pub cancelled: bool,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl DeploymentResult {
    /// Derive the overall status from per-resource states
    pub fn status_for(
        states: &BTreeMap<String, ResourceState>,
        cancelled: bool,
    ) -> DeploymentStatus {
        let all_ready = states.values().all(|s| s.status == ResourceStatus::Ready);
        let any_ready = states.values().any(|s| s.status == ResourceStatus::Ready);

        if all_ready {
            DeploymentStatus::Success
        } else if any_ready || cancelled {
            DeploymentStatus::PartialFailure
        } else {
            DeploymentStatus::Failure
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn state(&self, id: &str) -> Option<&ResourceState> {
        self.resource_states.get(id)
    }

    pub fn status_of(&self, id: &str) -> Option<ResourceStatus> {
        self.resource_states.get(id).map(|s| s.status)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    /// Counts per status
    pub fn summary(&self) -> DeploymentSummary {
        let count = |status| {
            self.resource_states
                .values()
                .filter(|s| s.status == status)
                .count()
        };
        DeploymentSummary {
            ready: count(ResourceStatus::Ready),
            failed: count(ResourceStatus::Failed),
            pending: count(ResourceStatus::Pending) + count(ResourceStatus::Creating),
        }
    }
}

/// Summary of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentSummary {
    pub ready: usize,
    pub failed: usize,
    pub pending: usize,
}

impl std::fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ready, {} failed, {} pending",
            self.ready, self.failed, self.pending
        )
    }
}
