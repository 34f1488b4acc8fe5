//! Resource model
//!
//! A [`ResourceSpec`] describes what to provision; a [`ResourceState`] tracks
//! what happened to it during one orchestration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Kind of provisionable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Function,
    Api,
    ApiConfig,
    Gateway,
    ApiKey,
}

impl ResourceKind {
    /// Whether the resource keeps converging after `create` returns and
    /// must be polled before dependents can use it
    pub fn is_async(&self) -> bool {
        matches!(self, ResourceKind::Gateway)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Function => write!(f, "function"),
            ResourceKind::Api => write!(f, "api"),
            ResourceKind::ApiConfig => write!(f, "api-config"),
            ResourceKind::Gateway => write!(f, "gateway"),
            ResourceKind::ApiKey => write!(f, "api-key"),
        }
    }
}

/// Parameter value passed through to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(i64),
    String(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::String(_) => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::String(value.to_string())
    }
}

/// Provider parameters, ordered for stable output
pub type Parameters = BTreeMap<String, ParamValue>;

/// One provisionable unit in the resource graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Unique identifier within the graph
    pub id: String,

    pub kind: ResourceKind,

    /// Ids that must be ready before this resource is created
    #[serde(default)]
    pub depends_on: BTreeSet<String>,

    /// Opaque to the orchestrator; interpreted by the provider
    #[serde(default)]
    pub parameters: Parameters,
}

impl ResourceSpec {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on: BTreeSet::new(),
            parameters: Parameters::new(),
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(ParamValue::as_str)
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.parameters.get(key).and_then(ParamValue::as_i64)
    }
}

/// Lifecycle status of a resource within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Not attempted yet
    Pending,
    /// Creation or readiness wait in progress
    Creating,
    /// Created (or already present) and usable
    Ready,
    /// Terminally failed for this run
    Failed,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Ready | ResourceStatus::Failed)
    }

    /// Allowed moves: Pending -> Creating -> Ready | Failed
    pub fn can_transition_to(&self, next: ResourceStatus) -> bool {
        matches!(
            (self, next),
            (ResourceStatus::Pending, ResourceStatus::Creating)
                | (ResourceStatus::Creating, ResourceStatus::Ready)
                | (ResourceStatus::Creating, ResourceStatus::Failed)
        )
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Pending => write!(f, "pending"),
            ResourceStatus::Creating => write!(f, "creating"),
            ResourceStatus::Ready => write!(f, "ready"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a resource ended up `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceError {
    /// Provider rejected the call; message kept verbatim
    Provider { message: String },
    /// Asynchronous resource never became ready within the bound
    ReadinessTimeout { waited_secs: u64 },
    /// The run was cancelled while waiting for readiness
    Cancelled,
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::Provider { message } => write!(f, "{}", message),
            ResourceError::ReadinessTimeout { waited_secs } => {
                write!(f, "not ready after {}s", waited_secs)
            }
            ResourceError::Cancelled => write!(f, "cancelled while waiting for readiness"),
        }
    }
}

/// Whether `create` made a new resource or found an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl std::fmt::Display for CreateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateOutcome::Created => write!(f, "created"),
            CreateOutcome::AlreadyExists => write!(f, "already exists"),
        }
    }
}

/// State of a single resource during one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: ResourceKind,

    pub status: ResourceStatus,

    /// Set when `create` returned
    pub outcome: Option<CreateOutcome>,

    /// Set when `status` is `Failed`
    pub error: Option<ResourceError>,

    /// Attributes reported by the provider (hostname, url, ...)
    pub attributes: HashMap<String, serde_json::Value>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            status: ResourceStatus::Pending,
            outcome: None,
            error: None,
            attributes: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Move to `next` if the lifecycle allows it.
    ///
    /// Returns `false` and leaves the state untouched otherwise; in particular
    /// `Ready` and `Failed` never change again.
    pub fn advance(&mut self, next: ResourceStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::debug!("Ignoring transition {} -> {}", self.status, next);
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    pub fn fail(&mut self, error: ResourceError) -> bool {
        if self.advance(ResourceStatus::Failed) {
            self.error = Some(error);
            true
        } else {
            false
        }
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
    fn test_lifecycle_transitions() {
        let mut state = ResourceState::new(ResourceKind::Api);

        assert!(!state.advance(ResourceStatus::Ready), "must pass through creating");
        assert!(state.advance(ResourceStatus::Creating));
        assert!(state.advance(ResourceStatus::Ready));

        // Ready is terminal
        assert!(!state.advance(ResourceStatus::Creating));
        assert!(!state.fail(ResourceError::Cancelled));
        assert_eq!(state.status, ResourceStatus::Ready);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut state = ResourceState::new(ResourceKind::Gateway);
        state.advance(ResourceStatus::Creating);
        assert!(state.fail(ResourceError::ReadinessTimeout { waited_secs: 600 }));

        assert!(!state.advance(ResourceStatus::Ready));
        assert_eq!(state.status, ResourceStatus::Failed);
        assert_eq!(
            state.error,
            Some(ResourceError::ReadinessTimeout { waited_secs: 600 })
        );
    }

    #[test]
    fn test_spec_params() {
        let spec = ResourceSpec::new("function", ResourceKind::Function)
            .with_param("name", "render")
            .with_param("memory", 512u32)
            .depends_on("api");

        assert_eq!(spec.param_str("name"), Some("render"));
        assert_eq!(spec.param_i64("memory"), Some(512));
        assert_eq!(spec.param_str("memory"), None);
        assert!(spec.depends_on.contains("api"));
    }

    #[test]
    fn test_param_value_untagged_serde() {
        let params: Parameters =
            serde_json::from_str(r#"{"memory": 256, "region": "us-central1"}"#).unwrap();
        assert_eq!(params["memory"], ParamValue::Number(256));
        assert_eq!(params["region"], ParamValue::String("us-central1".to_string()));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::ApiConfig.to_string(), "api-config");
        assert!(ResourceKind::Gateway.is_async());
        assert!(!ResourceKind::Function.is_async());
    }
}
