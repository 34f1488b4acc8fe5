//! Cloud provider trait definition

use crate::error::Result;
use crate::resource::{CreateOutcome, ResourceKind, ResourceSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cloud provider abstraction trait
///
/// Providers own authentication and session state. The orchestrator only
/// ever asks them to create, describe, or mint keys.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "gcp", "memory")
    fn name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Create the resource described by `spec`.
    ///
    /// A resource that is already present must be reported as
    /// [`CreateOutcome::AlreadyExists`], not as an error.
    async fn create(&self, spec: &ResourceSpec) -> Result<CreateOutcome>;

    /// Read the current provider-side view of `spec`
    async fn describe(&self, spec: &ResourceSpec) -> Result<ResourceDescriptor>;

    /// Mint an access key and return its secret value
    async fn create_key(&self, display_name: &str) -> Result<String>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Provider-side view of a resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,

    pub kind: Option<ResourceKind>,

    /// Provider lifecycle state (e.g. "ACTIVE", "CREATING")
    pub state: Option<String>,

    /// Externally reachable hostname, once assigned
    pub hostname: Option<String>,

    /// Any other attributes worth surfacing (url, managed service, ...)
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Readiness predicate: a non-empty hostname has been assigned
    pub fn is_ready(&self) -> bool {
        self.hostname
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_predicate() {
        let pending =
            ResourceDescriptor::new("gateway", ResourceKind::Gateway).with_state("CREATING");
        assert!(!pending.is_ready());

        let blank = ResourceDescriptor::new("gateway", ResourceKind::Gateway).with_hostname("  ");
        assert!(!blank.is_ready());

        let ready = ResourceDescriptor::new("gateway", ResourceKind::Gateway)
            .with_hostname("edge-1a2b3c.uc.gateway.dev");
        assert!(ready.is_ready());
    }

    #[test]
    fn test_auth_status() {
        let ok = AuthStatus::ok("ops@example.com");
        assert!(ok.authenticated);
        assert!(ok.error.is_none());

        let failed = AuthStatus::failed("no active account");
        assert!(!failed.authenticated);
        assert_eq!(failed.error.as_deref(), Some("no active account"));
    }
}
