//! Stack configuration model
//!
//! Every field is optional so that a config file, environment variables and
//! command-line flags can each supply a subset. Defaults and required-field
//! checks are applied by the graph builder in `gateflow-cloud`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options describing one function + API gateway stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct StackConfig {
    /// Cloud project identifier
    pub project_id: Option<String>,

    /// Region for the function and the gateway
    pub region: Option<String>,

    /// Deployed function name
    pub function_name: Option<String>,

    /// Function runtime (e.g. "python311")
    pub runtime: Option<String>,

    /// Function entry point
    pub entry_point: Option<String>,

    /// Directory containing the function source
    pub source_dir: Option<PathBuf>,

    /// Function memory in MB
    pub memory_mb: Option<u32>,

    /// Function timeout in seconds
    pub timeout_secs: Option<u32>,

    /// Allow unauthenticated invocations of the function
    pub allow_unauthenticated: Option<bool>,

    /// API identifier
    pub api_id: Option<String>,

    /// API config identifier
    pub api_config_id: Option<String>,

    /// Gateway identifier
    pub gateway_id: Option<String>,

    /// Path to the OpenAPI document for the API config
    pub openapi_spec: Option<PathBuf>,
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Fields set in `other` win; unset fields keep the current value.
    pub fn merge(&mut self, other: StackConfig) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            };
        }

        overlay!(
            project_id,
            region,
            function_name,
            runtime,
            entry_point,
            source_dir,
            memory_mb,
            timeout_secs,
            allow_unauthenticated,
            api_id,
            api_config_id,
            gateway_id,
            openapi_spec,
        );
    }

    /// Consuming variant of [`StackConfig::merge`]
    pub fn merged(mut self, other: StackConfig) -> Self {
        self.merge(other);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut base = StackConfig {
            project_id: Some("base-project".to_string()),
            region: Some("europe-west1".to_string()),
            memory_mb: Some(256),
            ..Default::default()
        };

        base.merge(StackConfig {
            region: Some("us-east1".to_string()),
            timeout_secs: Some(120),
            ..Default::default()
        });

        assert_eq!(base.project_id.as_deref(), Some("base-project"));
        assert_eq!(base.region.as_deref(), Some("us-east1"));
        assert_eq!(base.memory_mb, Some(256));
        assert_eq!(base.timeout_secs, Some(120));
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let base = StackConfig {
            api_id: Some("listings".to_string()),
            allow_unauthenticated: Some(false),
            ..Default::default()
        };

        let merged = base.clone().merged(StackConfig::new());
        assert_eq!(merged, base);
    }

    #[test]
    fn test_deserialize_partial_yaml() {
        let yaml = r#"
project_id: demo-project
memory_mb: 512
openapi_spec: api/openapi.yaml
"#;
        let config: StackConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.project_id.as_deref(), Some("demo-project"));
        assert_eq!(config.memory_mb, Some(512));
        assert_eq!(config.openapi_spec, Some(PathBuf::from("api/openapi.yaml")));
        assert!(config.region.is_none());
    }

    #[test]
    fn test_deserialize_rejects_unknown_field() {
        let yaml = "project: typo\n";
        assert!(serde_yaml::from_str::<StackConfig>(yaml).is_err());
    }
}
