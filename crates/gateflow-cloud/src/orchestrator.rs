//! Orchestrator
//!
//! Applies layered resource groups against a [`CloudProvider`]:
//!
//! - groups run strictly in order; resources inside a group run concurrently,
//!   bounded by the worker limit
//! - "already exists" counts as ready, so re-running a partially applied
//!   stack resumes where it stopped
//! - asynchronous kinds are polled until ready or until the bound elapses
//! - a failure lets its siblings finish, then stops before the next group;
//!   nothing is rolled back

use crate::error::CloudError;
use crate::graph::ResourceGroup;
use crate::provider::CloudProvider;
use crate::readiness::{PollConfig, Readiness, wait_until_ready};
use crate::resource::{
    ResourceError, ResourceKind, ResourceSpec, ResourceState, ResourceStatus,
};
use crate::result::DeploymentResult;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 4;

pub struct Orchestrator {
    provider: Arc<dyn CloudProvider>,
    concurrency: usize,
    poll: PollConfig,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn CloudProvider>) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_CONCURRENCY,
            poll: PollConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Maximum concurrent provider calls within a group (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Stop starting new creations once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply `groups` in order and report every resource's final state
    pub async fn apply(&self, groups: &[ResourceGroup]) -> DeploymentResult {
        let started_at = Utc::now();
        let mut states: BTreeMap<String, ResourceState> = groups
            .iter()
            .flatten()
            .map(|spec| (spec.id.clone(), ResourceState::new(spec.kind)))
            .collect();

        tracing::info!(
            provider = self.provider.name(),
            groups = groups.len(),
            resources = states.len(),
            "Applying resource graph"
        );

        for (index, group) in groups.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!("Cancelled before group {}/{}", index + 1, groups.len());
                break;
            }

            // Anything whose dependencies are not ready stays pending
            let (runnable, blocked): (Vec<&ResourceSpec>, Vec<&ResourceSpec>) =
                group.iter().partition(|spec| {
                    spec.depends_on.iter().all(|dep| {
                        states.get(dep).map(|s| s.status) == Some(ResourceStatus::Ready)
                    })
                });
            for spec in &blocked {
                tracing::warn!(
                    resource = %spec.id,
                    "Dependencies not ready; leaving resource pending"
                );
            }

            tracing::info!(
                "Group {}/{}: {}",
                index + 1,
                groups.len(),
                group
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let outcomes: Vec<(String, ResourceState)> = stream::iter(runnable)
                .map(|spec| async move { (spec.id.clone(), self.provision(spec).await) })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for (id, state) in outcomes {
                states.insert(id, state);
            }

            let group_ready = group.iter().all(|spec| {
                states.get(&spec.id).map(|s| s.status) == Some(ResourceStatus::Ready)
            });
            if !group_ready {
                if index + 1 < groups.len() {
                    tracing::warn!(
                        "Group {}/{} did not complete; later groups stay pending",
                        index + 1,
                        groups.len()
                    );
                }
                break;
            }
        }

        let cancelled = self.cancel.is_cancelled();
        let endpoint = groups.last().and_then(|group| endpoint_of(group, &states));
        let status = DeploymentResult::status_for(&states, cancelled);

        tracing::info!(status = %status, cancelled, "Apply finished");

        DeploymentResult {
            status,
            resource_states: states,
            endpoint,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Create one resource and, for asynchronous kinds, wait for readiness
    async fn provision(&self, spec: &ResourceSpec) -> ResourceState {
        let mut state = ResourceState::new(spec.kind);

        if self.cancel.is_cancelled() {
            tracing::debug!(resource = %spec.id, "Cancelled; not starting");
            return state;
        }

        state.advance(ResourceStatus::Creating);
        tracing::info!(resource = %spec.id, kind = %spec.kind, "Creating");

        match self.provider.create(spec).await {
            Ok(outcome) => {
                tracing::info!(resource = %spec.id, "{}", outcome);
                state.outcome = Some(outcome);
            }
            Err(e) => {
                tracing::warn!(resource = %spec.id, "Create failed: {}", e);
                state.fail(ResourceError::Provider {
                    message: provider_message(e),
                });
                return state;
            }
        }

        if spec.kind.is_async() {
            tracing::info!(resource = %spec.id, "Waiting for readiness");
            let readiness =
                wait_until_ready(self.provider.as_ref(), spec, &self.poll, &self.cancel).await;
            match readiness {
                Readiness::Ready(descriptor) => {
                    if let Some(hostname) = descriptor.hostname {
                        state
                            .attributes
                            .insert("hostname".to_string(), serde_json::json!(hostname));
                    }
                    if let Some(provider_state) = descriptor.state {
                        state
                            .attributes
                            .insert("state".to_string(), serde_json::json!(provider_state));
                    }
                    state.attributes.extend(descriptor.attributes);
                }
                Readiness::TimedOut { waited } => {
                    tracing::warn!(
                        resource = %spec.id,
                        waited_secs = waited.as_secs(),
                        "Readiness timeout"
                    );
                    state.fail(ResourceError::ReadinessTimeout {
                        waited_secs: waited.as_secs(),
                    });
                    return state;
                }
                Readiness::Cancelled => {
                    tracing::warn!(resource = %spec.id, "Cancelled while waiting for readiness");
                    state.fail(ResourceError::Cancelled);
                    return state;
                }
            }
        }

        state.advance(ResourceStatus::Ready);
        tracing::info!(resource = %spec.id, "Ready");
        state
    }
}

/// The provider's message verbatim, without our own prefix
fn provider_message(error: CloudError) -> String {
    match error {
        CloudError::Provider(message) => message,
        other => other.to_string(),
    }
}

/// `https://<hostname>` of the ready gateway in the final group
fn endpoint_of(
    group: &ResourceGroup,
    states: &BTreeMap<String, ResourceState>,
) -> Option<String> {
    group
        .iter()
        .filter(|spec| spec.kind == ResourceKind::Gateway)
        .filter_map(|spec| states.get(&spec.id))
        .filter(|state| state.status == ResourceStatus::Ready)
        .find_map(|state| state.get_attribute::<String>("hostname"))
        .map(|hostname| {
            if hostname.starts_with("http://") || hostname.starts_with("https://") {
                hostname
            } else {
                format!("https://{}", hostname)
            }
        })
}
