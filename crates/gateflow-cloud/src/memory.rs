//! In-memory provider
//!
//! Remembers which resources it has created, so re-applying a graph
//! behaves like re-running against a real, already-provisioned project.
//! Used by `gateflow deploy --dry-run` and throughout the test suite;
//! failures, slow calls and slow gateways can be injected.

use crate::error::{CloudError, Result};
use crate::provider::{AuthStatus, CloudProvider, ResourceDescriptor};
use crate::resource::{CreateOutcome, ResourceKind, ResourceSpec};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Operation recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOp {
    Create,
    Describe,
    CreateKey,
}

/// One provider call, with start and finish times
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub op: CallOp,
    /// Resource id, or display name for key requests
    pub target: String,
    pub started_at: Instant,
    pub finished_at: Instant,
    /// Set for successful `create` calls
    pub outcome: Option<CreateOutcome>,
}

#[derive(Debug, Default)]
struct MemoryState {
    existing: HashSet<String>,
    describe_counts: HashMap<String, u32>,
    calls: Vec<ProviderCall>,
    issued_keys: u64,
}

/// Provider backed by process memory
#[derive(Debug, Default)]
pub struct MemoryProvider {
    delay: Duration,
    create_failures: HashMap<String, String>,
    key_failures: HashSet<String>,
    never_ready: HashSet<String>,
    ready_after: HashMap<String, u32>,
    describe_delays: HashMap<String, Duration>,
    state: Mutex<MemoryState>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Pretend `id` already exists
    pub fn with_existing(mut self, id: impl Into<String>) -> Self {
        self.state.get_mut().existing.insert(id.into());
        self
    }

    /// `create(id)` fails with `message`
    pub fn fail_create(mut self, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.create_failures.insert(id.into(), message.into());
        self
    }

    /// `create_key(display_name)` fails
    pub fn fail_key(mut self, display_name: impl Into<String>) -> Self {
        self.key_failures.insert(display_name.into());
        self
    }

    /// `describe(id)` never reports a hostname
    pub fn never_ready(mut self, id: impl Into<String>) -> Self {
        self.never_ready.insert(id.into());
        self
    }

    /// `describe(id)` reports a hostname from the `polls`-th call on
    pub fn ready_after(mut self, id: impl Into<String>, polls: u32) -> Self {
        self.ready_after.insert(id.into(), polls);
        self
    }

    /// `describe(id)` takes an extra `delay` before answering
    pub fn slow_describe(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.describe_delays.insert(id.into(), delay);
        self
    }

    /// Snapshot of every call made so far
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of `create` calls that actually created something
    pub async fn created_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.op == CallOp::Create && c.outcome == Some(CreateOutcome::Created))
            .count()
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.state.lock().await.existing.contains(id)
    }

    async fn record(
        &self,
        op: CallOp,
        target: &str,
        started_at: Instant,
        outcome: Option<CreateOutcome>,
    ) {
        self.state.lock().await.calls.push(ProviderCall {
            op,
            target: target.to_string(),
            started_at,
            finished_at: Instant::now(),
            outcome,
        });
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }

    fn hostname_for(spec: &ResourceSpec) -> String {
        let name = spec.param_str("gateway_id").unwrap_or(&spec.id);
        format!("{}.gateway.local", name)
    }
}

#[async_trait]
impl CloudProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("in-memory"))
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<CreateOutcome> {
        let started_at = Instant::now();
        self.pause().await;

        if let Some(message) = self.create_failures.get(&spec.id) {
            self.record(CallOp::Create, &spec.id, started_at, None).await;
            return Err(CloudError::provider(message.clone()));
        }

        let outcome = {
            let mut state = self.state.lock().await;
            if state.existing.insert(spec.id.clone()) {
                CreateOutcome::Created
            } else {
                CreateOutcome::AlreadyExists
            }
        };

        tracing::debug!(resource = %spec.id, kind = %spec.kind, "memory create: {}", outcome);
        self.record(CallOp::Create, &spec.id, started_at, Some(outcome))
            .await;
        Ok(outcome)
    }

    async fn describe(&self, spec: &ResourceSpec) -> Result<ResourceDescriptor> {
        let started_at = Instant::now();
        self.pause().await;
        if let Some(delay) = self.describe_delays.get(&spec.id) {
            sleep(*delay).await;
        }

        let polls = {
            let mut state = self.state.lock().await;
            if !state.existing.contains(&spec.id) {
                drop(state);
                self.record(CallOp::Describe, &spec.id, started_at, None).await;
                return Err(CloudError::ResourceNotFound(spec.id.clone()));
            }
            let count = state.describe_counts.entry(spec.id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.record(CallOp::Describe, &spec.id, started_at, None).await;

        let mut descriptor = ResourceDescriptor::new(spec.id.clone(), spec.kind);
        let ready = !self.never_ready.contains(&spec.id)
            && self.ready_after.get(&spec.id).is_none_or(|n| polls >= *n);

        if spec.kind == ResourceKind::Gateway && ready {
            descriptor = descriptor
                .with_state("ACTIVE")
                .with_hostname(Self::hostname_for(spec));
        } else if spec.kind == ResourceKind::Gateway {
            descriptor = descriptor.with_state("CREATING");
        } else {
            descriptor = descriptor.with_state("ACTIVE");
        }
        Ok(descriptor)
    }

    async fn create_key(&self, display_name: &str) -> Result<String> {
        let started_at = Instant::now();
        self.pause().await;

        if self.key_failures.contains(display_name) {
            self.record(CallOp::CreateKey, display_name, started_at, None)
                .await;
            return Err(CloudError::provider(format!(
                "quota exceeded while creating key '{}'",
                display_name
            )));
        }

        let serial = {
            let mut state = self.state.lock().await;
            state.issued_keys += 1;
            state.issued_keys
        };
        self.record(CallOp::CreateKey, display_name, started_at, None)
            .await;
        Ok(format!("mem-key-{:04}", serial))
    }
}
